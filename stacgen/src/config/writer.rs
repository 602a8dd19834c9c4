//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::fmt::Write;
use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let api_url = config.catalog.api_url.as_deref().unwrap_or("");

    let mut out = format!(
        r#"[catalog]
; Base URL of the STAC API items are published to, e.g. http://localhost:8080
; Leave empty to disable publishing.
api_url = {}
; Publish every item produced by the worker to the STAC API (default: false)
publish = {}
; POST/PUT attempts before a publish is abandoned (default: 5)
max_retries = {}
; Seconds to wait between attempts (default: 5)
retry_delay_secs = {}
; License reported when a raster has no Copyright tag (default: proprietary)
default_license = {}

[raster]
; Validate GeoTIFFs as Cloud Optimized GeoTIFFs and report the
; cloud-optimized media type profile when they pass (default: false)
check_cog = {}
; Log every COG validation report at info level (default: false)
log_cog_info = {}
; Treat COG warnings as failures (default: false)
strict_cog = {}

[queue]
; Redis connection URL
url = {}
; List jobs are popped from (default: stac_generator_input)
input_list = {}
; List produced items are pushed to (default: stac_generator_output)
output_list = {}
; Push every produced item to the output list (default: false)
publish = {}
; Blocking pop timeout in seconds; bounds how long shutdown takes (default: 1)
pop_timeout_secs = {}

[assets]
; Download remote job files into their mount before assembly (default: false)
download = {}
; Delete files downloaded for a job once it finishes (default: true)
cleanup = {}
; Timeout in seconds for metadata and asset downloads (default: 30)
http_timeout_secs = {}

[logging]
; Log file path
file = {}
"#,
        api_url,
        config.catalog.publish,
        config.catalog.max_retries,
        config.catalog.retry_delay_secs,
        config.catalog.default_license,
        config.raster.check_cog,
        config.raster.log_cog_info,
        config.raster.strict_cog,
        config.queue.url,
        config.queue.input_list,
        config.queue.output_list,
        config.queue.publish,
        config.queue.pop_timeout_secs,
        config.assets.download,
        config.assets.cleanup,
        config.assets.http_timeout_secs,
        path_to_string(&config.logging.file),
    );

    if config.mounts.is_empty() {
        out.push_str(
            r#"
; Map storage URL prefixes to local directories, one section per mount:
;
; [mount.imagery]
; url = https://account.blob.core.windows.net/imagery
; path = /mnt/imagery
"#,
        );
    }

    for mount in &config.mounts {
        // Writing to a String cannot fail
        let _ = write!(
            out,
            "\n[mount.{}]\nurl = {}\npath = {}\n",
            mount.name,
            mount.url,
            path_to_string(&mount.path)
        );
    }

    out
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountSettings;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_mentions_every_section() {
        let content = to_config_string(&ConfigFile::default());
        for section in ["[catalog]", "[raster]", "[queue]", "[assets]", "[logging]"] {
            assert!(content.contains(section), "missing {}", section);
        }
        assert!(content.contains("; [mount.imagery]"));
        assert!(content.contains("max_retries = 5"));
    }

    #[test]
    fn test_mounts_are_written() {
        let mut config = ConfigFile::default();
        config.mounts.push(MountSettings {
            name: "imagery".to_string(),
            url: "https://acct.blob.core.windows.net/imagery".to_string(),
            path: PathBuf::from("/mnt/imagery"),
        });

        let content = to_config_string(&config);
        assert!(content.contains("[mount.imagery]\nurl = https://acct.blob.core.windows.net/imagery\npath = /mnt/imagery\n"));
        assert!(!content.contains("; [mount.imagery]"));
    }
}
