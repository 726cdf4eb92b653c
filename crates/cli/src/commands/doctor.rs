//! `lookout doctor`: Diagnose configuration.

use lookout_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 LookOut Doctor — Configuration Check");
    println!("=======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `lookout onboard` (defaults will be used)");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            println!(
                "  ✅ Frames on '{}', locations on '{}'",
                config.session.frame_topic, config.session.location_topic
            );
            println!(
                "  ✅ Up to {} concurrent frames of at most {} bytes",
                config.session.max_active_streams, config.session.max_frame_bytes
            );

            if config.has_maps_key() {
                println!("  ✅ Google Maps API key configured");
            } else {
                println!(
                    "  ⚠️  No Google Maps API key — set GOOGLE_MAPS_API or add google_maps_api_key to config.toml"
                );
                issues += 1;
            }

            match lookout_providers::build_from_config(&config) {
                Ok(provider) => println!("  ✅ Directions provider ready ({})", provider.name()),
                Err(e) => {
                    println!("  ❌ Directions provider unavailable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
