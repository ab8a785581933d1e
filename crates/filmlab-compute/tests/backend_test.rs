//! Backend tests for filmlab-compute.

use filmlab_compute::{
    Backend, Executor, ExecutorBuilder, Neighborhood, PixelKernel, describe_backends,
    select_best_backend,
};
use filmlab_core::{ColorDomain, ImageBuffer};

/// 3x3 max filter on the red channel.
struct RedDilate;

impl PixelKernel for RedDilate {
    fn name(&self) -> &'static str {
        "red_dilate"
    }

    fn radius(&self) -> usize {
        1
    }

    fn apply(&self, n: &Neighborhood<'_>) -> [f32; 3] {
        let mut best = n.center();
        for dy in -1..=1 {
            for dx in -1..=1 {
                best[0] = best[0].max(n.get(dx, dy)[0]);
            }
        }
        best
    }
}

#[test]
fn test_cpu_backend_available() {
    assert!(Backend::Cpu.is_available());
    assert_eq!(select_best_backend(), Backend::Cpu);
}

#[test]
fn test_auto_backend() {
    let exec = Executor::auto().unwrap();
    assert_eq!(exec.backend_name(), "cpu");
}

#[test]
fn test_describe_backends() {
    let desc = describe_backends();
    assert!(desc.contains("[+] CPU"));
}

#[test]
fn test_backend_parse() {
    assert_eq!("CPU".parse::<Backend>().unwrap(), Backend::Cpu);
    assert!("cuda".parse::<Backend>().is_err());
}

#[test]
fn test_neighborhood_kernel() {
    let exec = Executor::cpu();
    let mut img = ImageBuffer::filled(5, 5, ColorDomain::LinearTransmittance, [0.0; 3]);
    img.set_pixel(2, 2, [1.0, 0.0, 0.0]);

    let out = exec.run(&img, &RedDilate).unwrap();
    for y in 0..5 {
        for x in 0..5 {
            let inside = (1..=3).contains(&x) && (1..=3).contains(&y);
            let expected = if inside { 1.0 } else { 0.0 };
            assert_eq!(out.pixel(x, y)[0], expected, "at ({x}, {y})");
        }
    }
    // source untouched
    assert_eq!(img.pixel(1, 1)[0], 0.0);
}

#[test]
fn test_map_tags_domain() {
    let exec = ExecutorBuilder::new().band_bytes(12).build().unwrap();
    let img = ImageBuffer::filled(3, 4, ColorDomain::LinearTransmittance, [0.1, 0.2, 0.3]);
    let out = exec
        .map(&img, "swap", ColorDomain::DisplayEncoded, |[r, g, b]| [b, g, r])
        .unwrap();
    assert_eq!(out.domain(), ColorDomain::DisplayEncoded);
    assert_eq!(out.pixel(2, 3), [0.3, 0.2, 0.1]);
}

#[test]
fn test_memory_limit_rejects() {
    let exec = ExecutorBuilder::new().memory_limit(10).build().unwrap();
    let img = ImageBuffer::filled(8, 8, ColorDomain::LinearTransmittance, [0.0; 3]);
    assert!(exec.run(&img, &RedDilate).is_err());
}
