//! Golden vector tests — load JSON vectors, interpolate, compare output.
//!
//! Each vector pins the exact escaped path the fixture guest produces for a
//! set of static and dynamic segments. A mismatch means either the guest's
//! encoding rule or the host's array layout changed.

mod common;

use serde::Deserialize;

use common::*;

/// JSON representation of a golden vector test case.
#[derive(Deserialize)]
struct GoldenVector {
    name: String,
    statics: Vec<String>,
    dynamics: Vec<String>,
    expected: String,
}

fn load_vectors() -> Vec<GoldenVector> {
    let json = include_str!("vectors/interpolation.json");
    serde_json::from_str(json).unwrap()
}

// ── Test: every vector on a fresh context ──

#[test]
fn test_golden_interpolation() {
    for vector in load_vectors() {
        let statics: Vec<&str> = vector.statics.iter().map(String::as_str).collect();
        let interpolator = interpolator(&statics);
        let output = interpolator.interpolate(&vector.dynamics).unwrap();
        assert_eq!(output, vector.expected, "[{}] output mismatch", vector.name);
    }
}

// ── Test: every vector through one shared context ──

#[test]
fn test_golden_interpolation_shared_context() {
    let context = load_context();
    for vector in load_vectors() {
        let interpolator =
            safepath_sandbox::Interpolator::new(context.clone(), &vector.statics).unwrap();
        let output = interpolator.interpolate(&vector.dynamics).unwrap();
        assert_eq!(output, vector.expected, "[{}] output mismatch", vector.name);
    }
    // every interpolator above has been dropped
    assert_eq!(live_regions(&context), 0);
    assert_eq!(live_bytes(&context), 0);
}
