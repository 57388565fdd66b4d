//! One-time platform environment setup.
//!
//! Populates the environment overrides every spawned command inherits.
//! Mac needs nothing; unsupported platforms were already rejected when the
//! context was constructed.

use crate::context::{BuildContext, Platform};

pub fn setup_environment(ctx: &mut BuildContext) {
    // The SCons wrappers and driver scripts key off this to pick CI-safe
    // defaults (no colorized output, no interactive prompts).
    ctx.env
        .insert("PNACL_BUILDBOT".to_string(), "true".to_string());

    match ctx.platform {
        Platform::Linux => {
            ctx.env.insert("LANG".to_string(), "C.UTF-8".to_string());
            ctx.env.insert("TERM".to_string(), "dumb".to_string());
        }
        Platform::Windows => {
            // The gyp/MSVS shims expect a pinned toolchain version.
            ctx.env
                .insert("GYP_MSVS_VERSION".to_string(), "2013".to_string());
        }
        Platform::Mac => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Arch;

    #[test]
    fn linux_setup_pins_locale() {
        let mut ctx = BuildContext::new(Arch::X8664, Platform::Linux);
        setup_environment(&mut ctx);
        assert_eq!(ctx.env.get("PNACL_BUILDBOT").map(String::as_str), Some("true"));
        assert_eq!(ctx.env.get("LANG").map(String::as_str), Some("C.UTF-8"));
    }

    #[test]
    fn mac_setup_is_minimal() {
        let mut ctx = BuildContext::new(Arch::X8632, Platform::Mac);
        setup_environment(&mut ctx);
        assert_eq!(ctx.env.len(), 1);
        assert!(ctx.env.contains_key("PNACL_BUILDBOT"));
    }

    #[test]
    fn windows_setup_pins_msvs() {
        let mut ctx = BuildContext::new(Arch::X8632, Platform::Windows);
        setup_environment(&mut ctx);
        assert!(ctx.env.contains_key("GYP_MSVS_VERSION"));
    }
}
