//! Interpolator sessions — the public facade.
//!
//! An `Interpolator` encodes its static path segments into guest memory once
//! and keeps that region for its whole lifetime. Each
//! [`interpolate`](Interpolator::interpolate) call encodes the dynamic
//! segments into a transient region, runs the guest, decodes the result, and
//! releases the transient region on every path. The statics region is
//! released exactly once, by [`close`](Interpolator::close) or on drop.
//!
//! Result strings live in guest-owned memory; the protocol has no call to
//! release them, so this layer never does.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use safepath_abi::{layout, memory, GuestAddr, GuestAllocator, GuestMemory, Region};

use crate::config::GuestConfig;
use crate::context::{ContextCell, GuestContext};
use crate::error::SandboxError;

/// A set of static path segments bound to a guest context.
pub struct Interpolator {
    context: Arc<GuestContext>,
    statics: Option<Region>,
}

impl Interpolator {
    /// Encode `statics` into the guest and hold the region.
    pub fn new<S: AsRef<str>>(
        context: Arc<GuestContext>,
        statics: &[S],
    ) -> Result<Self, SandboxError> {
        let region = context.with_guest(|guest| Ok(layout::encode(guest, statics)?))?;
        debug!(
            address = %region.address(),
            size = region.size(),
            segments = statics.len(),
            "interpolator created"
        );
        Ok(Self {
            context,
            statics: Some(region),
        })
    }

    /// Build an interpolator from raw module bytes.
    ///
    /// Bootstraps the guest through `cell` with the default configuration if
    /// it has not been bootstrapped yet, otherwise reuses the stored context.
    pub fn from_module<S: AsRef<str>>(
        cell: &ContextCell,
        module_bytes: &[u8],
        statics: &[S],
    ) -> Result<Self, SandboxError> {
        let context = cell.get_or_bootstrap(module_bytes, &GuestConfig::default())?;
        Self::new(context, statics)
    }

    /// Interpolate `dynamics` between the static segments.
    ///
    /// On failure the statics region is untouched and the interpolator can be
    /// called again with different dynamics.
    pub fn interpolate<S: AsRef<str>>(&self, dynamics: &[S]) -> Result<String, SandboxError> {
        let statics = self
            .statics
            .as_ref()
            .map(Region::address)
            .ok_or(SandboxError::Usage("interpolator already released"))?;

        self.context.with_guest(|guest| {
            let region = layout::encode(guest, dynamics)?;
            let result = guest
                .call_interpolate(statics, region.address())
                .and_then(|addr| Ok(memory::read_fat_str(guest.memory(), addr)?));

            let (address, size) = (region.address(), region.size());
            match (result, guest.release(region)) {
                (Ok(output), Ok(())) => Ok(output),
                (Ok(_), Err(release_err)) => Err(release_err.into()),
                (Err(err), Ok(())) => Err(err),
                (Err(err), Err(release_err)) => {
                    warn!(%address, size, error = %release_err, "failed to release dynamics region");
                    Err(err)
                }
            }
        })
    }

    /// Release the statics region. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), SandboxError> {
        let Some(region) = self.statics.take() else {
            return Ok(());
        };
        debug!(address = %region.address(), size = region.size(), "interpolator released");
        self.context
            .with_guest(|guest| Ok(guest.release(region)?))
    }

    pub fn is_released(&self) -> bool {
        self.statics.is_none()
    }

    /// Address and size of the held statics region, while not released.
    pub fn statics_region(&self) -> Option<(GuestAddr, u32)> {
        self.statics
            .as_ref()
            .map(|region| (region.address(), region.size()))
    }

    pub fn context(&self) -> &Arc<GuestContext> {
        &self.context
    }
}

impl Drop for Interpolator {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to release statics region on drop");
        }
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("statics", &self.statics)
            .field("context", &self.context)
            .finish()
    }
}
