//! `lookout directions`: One-shot walking directions through the tool path.

use lookout_config::AppConfig;
use lookout_core::location::{LocationCell, UserLocation};
use lookout_tools::GetDirectionsTool;

pub async fn run(
    from: String,
    to: String,
    here: Option<(f64, f64)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = lookout_providers::build_from_config(&config).map_err(|e| {
        format!("{e}. Set GOOGLE_MAPS_API or run `lookout onboard` and add google_maps_api_key.")
    })?;

    let location = LocationCell::new();
    if let Some((lat, lng)) = here {
        let fix = UserLocation::new(lat, lng);
        if !fix.is_valid() {
            return Err(format!("Invalid coordinates: {lat},{lng}").into());
        }
        location.set(fix);
    }

    let tool = GetDirectionsTool::new(provider, location);
    println!("{}", tool.get_directions(&from, &to).await);

    Ok(())
}
