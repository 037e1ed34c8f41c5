//! Attach-mode fallback chains. Grounded on `huginn-proxy-ebpf`'s single-call
//! `program.attach(interface, XdpFlags::default())`, generalized here to the
//! multi-mode degrade chains this project's loader requires.

use aya::programs::{Xdp, XdpFlags};
use tracing::{info, warn};

use crate::error::{LoaderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    Native,
    Skb,
    Offload,
}

impl AttachMode {
    fn flags(self) -> XdpFlags {
        match self {
            AttachMode::Native => XdpFlags::DRV_MODE,
            AttachMode::Skb => XdpFlags::SKB_MODE,
            AttachMode::Offload => XdpFlags::HW_MODE,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AttachMode::Native => "native",
            AttachMode::Skb => "skb",
            AttachMode::Offload => "offload",
        }
    }
}

/// Mode requested on the command line. `None` means "let the loader pick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedMode {
    Offload,
    Skb,
}

/// Builds the ordered list of modes to try.
///
/// Unforced: native -> SKB -> offload, stopping at the first success.
/// Forced HW: try offload first; on failure degrade through native -> SKB.
/// Forced SKB: try SKB only; on failure, give up immediately — matching the
/// original's `AttachXdp`, where only the HW-forced path degrades further.
fn fallback_order(forced: Option<ForcedMode>) -> Vec<AttachMode> {
    match forced {
        None => vec![AttachMode::Native, AttachMode::Skb, AttachMode::Offload],
        Some(ForcedMode::Offload) => {
            vec![AttachMode::Offload, AttachMode::Native, AttachMode::Skb]
        }
        Some(ForcedMode::Skb) => vec![AttachMode::Skb],
    }
}

/// Tries each mode in turn, returning the mode that succeeded. The program
/// must already be loaded (`Xdp::load` called) before this runs.
pub fn attach_with_fallback(
    program: &mut Xdp,
    interface: &str,
    forced: Option<ForcedMode>,
) -> Result<AttachMode> {
    let order = fallback_order(forced);
    let mut last_err = None;

    for mode in order {
        match program.attach(interface, mode.flags()) {
            Ok(_) => {
                info!(interface, mode = mode.label(), "XDP program attached");
                return Ok(mode);
            }
            Err(e) => {
                warn!(interface, mode = mode.label(), error = %e, "attach mode failed, trying next");
                last_err = Some(e);
            }
        }
    }

    Err(LoaderError::AttachExhausted {
        interface: interface.to_string(),
        source: last_err.expect("fallback_order never returns an empty list"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unforced_order_is_native_then_skb_then_offload() {
        assert_eq!(
            fallback_order(None),
            vec![AttachMode::Native, AttachMode::Skb, AttachMode::Offload]
        );
    }

    #[test]
    fn forced_offload_degrades_through_native_and_skb() {
        assert_eq!(
            fallback_order(Some(ForcedMode::Offload)),
            vec![AttachMode::Offload, AttachMode::Native, AttachMode::Skb]
        );
    }

    #[test]
    fn forced_skb_never_degrades() {
        assert_eq!(fallback_order(Some(ForcedMode::Skb)), vec![AttachMode::Skb]);
    }
}
