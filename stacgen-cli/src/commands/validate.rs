//! Validate command - check a GeoTIFF against the cloud-optimized layout.

use std::path::PathBuf;

use stacgen::raster::{CogValidator, ValidationReport};

use crate::error::CliError;

/// Arguments for the validate command.
pub struct ValidateArgs {
    pub path: PathBuf,
    pub strict: bool,
    pub json: bool,
}

/// Validate one file, exiting non-zero when it is not a valid COG.
pub fn run(args: ValidateArgs) -> Result<(), CliError> {
    let report = CogValidator::builtin()
        .validate(&args.path, args.strict)
        .map_err(|error| CliError::Raster {
            path: args.path.clone(),
            error,
        })?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).unwrap_or_default();
        println!("{}", json);
    } else {
        print!("{}", format_report(&args.path.display().to_string(), &report));
    }

    if report.is_valid {
        Ok(())
    } else {
        Err(CliError::InvalidCog(args.path))
    }
}

fn format_report(name: &str, report: &ValidationReport) -> String {
    let mut out = String::new();
    for warning in &report.warnings {
        out.push_str(&format!("Warning: {}\n", warning));
    }
    for error in &report.errors {
        out.push_str(&format!("Error: {}\n", error));
    }
    if report.is_valid {
        out.push_str(&format!("{} is a valid cloud optimized GeoTIFF\n", name));
    }
    out
}
