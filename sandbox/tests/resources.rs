//! Resource limit tests — memory caps, fuel, and guest traps.
//!
//! Every failure here must leave the interpolator usable and the guest's
//! allocation ledger balanced.

mod common;

use safepath_abi::AbiError;
use safepath_sandbox::{GuestConfig, Interpolator, SandboxError};

use common::*;

// ── Test: dynamics too large to allocate ──

#[test]
fn test_allocation_failure_keeps_statics() {
    let context = load_context_with_config(GuestConfig {
        max_memory_pages: 2,
        ..GuestConfig::default()
    });
    let interpolator = Interpolator::new(context.clone(), &["/files/", ""]).unwrap();

    let huge = "a".repeat(200_000);
    let err = interpolator.interpolate(&[huge.as_str()]).unwrap_err();
    assert!(
        matches!(err, SandboxError::Abi(AbiError::Allocation { .. })),
        "expected allocation error, got {:?}",
        err
    );
    assert_eq!(live_regions(&context), 1);

    // retry with a small value succeeds on the same statics
    assert_eq!(interpolator.interpolate(&["ok"]).unwrap(), "/files/ok");
    assert_eq!(live_regions(&context), 1);
}

// ── Test: guest runs out of memory for its output ──

#[test]
fn test_guest_output_oom_releases_dynamics() {
    let context = load_context_with_config(GuestConfig {
        max_memory_pages: 2,
        ..GuestConfig::default()
    });
    let interpolator = Interpolator::new(context.clone(), &["/files/", ""]).unwrap();

    // input fits, the escaped output does not
    let big = "a".repeat(40_000);
    let err = interpolator.interpolate(&[big.as_str()]).unwrap_err();
    assert!(matches!(err, SandboxError::GuestTrapped(_)), "got {:?}", err);
    assert_eq!(live_regions(&context), 1);
    assert_eq!(live_bytes(&context), encoded_size(&["/files/", ""]));
}

// ── Test: fuel limit ──

#[test]
fn test_fuel_exhaustion_is_reported() {
    let context = load_context_with_config(GuestConfig {
        fuel_limit: 5_000,
        ..GuestConfig::default()
    });
    let interpolator = Interpolator::new(context.clone(), &["/a/", ""]).unwrap();

    let long = "z".repeat(5_000);
    let err = interpolator.interpolate(&[long.as_str()]).unwrap_err();
    assert!(matches!(err, SandboxError::FuelExhausted), "got {:?}", err);
    assert_eq!(live_regions(&context), 1);

    // fuel is refilled per call
    assert_eq!(interpolator.interpolate(&["b"]).unwrap(), "/a/b");
}

// ── Test: guest trap on empty statics ──

#[test]
fn test_empty_statics_trap_in_guest() {
    let context = load_context();
    let no_statics: [&str; 0] = [];
    let interpolator = Interpolator::new(context.clone(), &no_statics).unwrap();
    assert_eq!(live_bytes(&context), encoded_size(&[]));

    let err = interpolator.interpolate(&["x"]).unwrap_err();
    assert!(matches!(err, SandboxError::GuestTrapped(_)), "got {:?}", err);
    assert_eq!(live_regions(&context), 1);
}

// ── Test: initial memory above the cap ──

#[test]
fn test_memory_cap_below_initial_memory_fails_bootstrap() {
    let err = safepath_sandbox::GuestContext::bootstrap(
        GUEST_WAT.as_bytes(),
        &GuestConfig {
            max_memory_pages: 0,
            ..GuestConfig::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, SandboxError::Bootstrap(_)));
}
