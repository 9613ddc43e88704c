//! The `mac` command - prints an interface's hardware address.

use clap::Args;

#[derive(Args)]
pub struct MacArgs {
    /// Interface name (e.g. eth0)
    interface: String,

    /// Query the address this many times and fail if it changes
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,
}

pub fn run(args: MacArgs) -> anyhow::Result<()> {
    let first = rawether::mac_address(&args.interface)?;

    for _ in 1..args.repeat {
        let again = rawether::mac_address(&args.interface)?;
        if again != first {
            anyhow::bail!(
                "hardware address of {} changed from {} to {}",
                args.interface,
                first,
                again
            );
        }
    }

    println!("{}", first);
    Ok(())
}
