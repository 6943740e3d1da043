//! Version command

use crate::output::OutputContext;
use crate::output::human::HumanRenderer;

/// Run the version command.
pub fn run(ctx: &OutputContext) {
    let version = env!("CARGO_PKG_VERSION");

    if ctx.json {
        println!(r#"{{"version":"{version}"}}"#);
    } else {
        HumanRenderer::new(ctx).render_version(version);
    }
}
