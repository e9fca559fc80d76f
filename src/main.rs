//! Portrait cropper - command-line tool for extracting portraits from sprite atlases

use std::process::ExitCode;

use portrait_crop::cli;

fn main() -> ExitCode {
    cli::run()
}
