mod progress;
mod status;
mod styling;
mod tables;

pub use progress::FetchProgress;
pub use status::{print_channels, print_snapshot};
pub use styling::{dim, magenta_bold};

/// Prints the buildwatch banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔔 buildwatch"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI build notifications")
    );
}
