use crate::context::AppContext;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use portal_auth::{Route, Router};

/// Resolve a route through the auth guard and print where it lands.
pub async fn open(ctx: &AppContext, requested: Route, format: &OutputFormat) -> Result<()> {
    let router = Router::new(ctx.session.clone());
    let resolved = router.resolve(requested);

    match format {
        OutputFormat::Json => output::print_value(&serde_json::json!({
            "requested": requested.name(),
            "resolved": resolved.name(),
            "path": resolved.path(),
            "redirected": resolved != requested,
        })),
        OutputFormat::Text => {
            if resolved != requested {
                output::print_warning(
                    &format!("{} requires sign-in, redirected to {}", requested, resolved),
                    format,
                );
            }
            println!("{} ({})", resolved.name(), resolved.path());
        }
    }
    Ok(())
}
