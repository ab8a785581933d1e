//! Integration tests for filmlab crates.
//!
//! This crate contains end-to-end tests that exercise the interaction
//! between the I/O, compute and development crates.

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    use filmlab_core::{ColorDomain, ImageBuffer, ProcessMode};
    use filmlab_io::png::{self, BitDepth};
    use filmlab_ops::exposure::ExposureParams;
    use filmlab_ops::geometry::GeometryTransform;
    use filmlab_ops::normalize::NormalizeKernel;
    use filmlab_ops::retouch::RetouchSpot;
    use filmlab_ops::settings::ExposureSettings;
    use filmlab_ops::toning::{SEPIA_CENTER, selenium_mask, sepia_mask};
    use filmlab_ops::{
        DevelopSettings, Pipeline, RenderSession, Roll, analyze_bounds, analyze_roll, apply_heal, detect_dust,
        run_pipeline,
    };

    /// Synthetic color negative: orange base, density rising to the right.
    fn negative(w: usize, h: usize, exposure: f32) -> ImageBuffer {
        ImageBuffer::from_fn(w, h, ColorDomain::LinearTransmittance, |x, y| {
            let t = exposure * (0.1 + 0.8 * x as f32 / w as f32) * (0.6 + 0.4 * y as f32 / h as f32);
            [t, t * 0.62, t * 0.38]
        })
    }

    fn full_frame() -> DevelopSettings {
        let mut s = DevelopSettings::default();
        s.geometry.autocrop = false;
        s.geometry.keep_full_frame = true;
        s
    }

    /// Scan -> PNG -> develop -> PNG
    #[test]
    fn test_develop_png_roundtrip() {
        let dir = tempdir().unwrap();
        let scan_path = dir.path().join("scan.png");
        let print_path = dir.path().join("print.png");

        let scan = negative(48, 32, 0.7);
        png::write(&scan_path, &scan, BitDepth::Sixteen).expect("Failed to write scan");
        let loaded = png::read(&scan_path, true).expect("Failed to read scan");
        assert_eq!(loaded.dimensions(), (48, 32));
        assert_relative_eq!(loaded.pixel(20, 10)[0], scan.pixel(20, 10)[0], max_relative = 1e-2);

        let print = run_pipeline(&loaded, &full_frame(), ProcessMode::C41).unwrap();
        assert_eq!(print.domain(), ColorDomain::DisplayEncoded);
        png::write(&print_path, &print, BitDepth::Eight).expect("Failed to write print");

        let back = png::read(&print_path, false).unwrap();
        assert_eq!(back.dimensions(), print.dimensions());
        for (a, b) in print.data().iter().zip(back.data()) {
            assert!((a - b).abs() <= 0.5 / 255.0 + 1e-6);
        }
    }

    /// Settings file with only a few keys; the rest default.
    #[test]
    fn test_settings_file_drives_pipeline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("look.yaml");
        std::fs::write(
            &path,
            "process:\n  mode: B&W\ngeometry:\n  autocrop: false\n  keep_full_frame: true\n\
             toning:\n  paper_profile: Warm Fiber\n  selenium_strength: 0.5\n",
        )
        .unwrap();

        let settings = DevelopSettings::from_file(&path).unwrap();
        assert_eq!(settings.process.mode, ProcessMode::Bw);
        assert_eq!(settings.exposure.output_gamma, ExposureSettings::default().output_gamma);

        let print = run_pipeline(&negative(32, 24, 0.6), &settings, settings.process.mode).unwrap();
        assert!(print.is_finite());
        // warm paper on a monochrome print: red above blue everywhere
        for p in print.pixels() {
            assert!(p[0] >= p[2] - 1e-6);
        }
    }

    #[test]
    fn test_normalize_maps_bounds_to_unit_range() {
        for mode in ProcessMode::ALL {
            let bounds = analyze_bounds(&negative(40, 40, 0.8), mode, 0.05).unwrap();
            let kernel = NormalizeKernel::new(&bounds);
            let at_floor = kernel.eval(bounds.floors.map(|f| 10f32.powf(f)));
            let at_ceil = kernel.eval(bounds.ceils.map(|c| 10f32.powf(c)));
            for c in 0..3 {
                assert!(at_floor[c].abs() < 1e-3, "{mode} floor {c}: {}", at_floor[c]);
                assert!((at_ceil[c] - 1.0).abs() < 1e-3, "{mode} ceil {c}: {}", at_ceil[c]);
            }
        }
    }

    #[test]
    fn test_exposure_output_in_unit_range() {
        for mode in ProcessMode::ALL {
            for density in [-1.0, 0.0, 1.0, 2.5, 5.0] {
                for grade in [0.0, 2.0, 5.0] {
                    let settings = ExposureSettings {
                        density,
                        grade,
                        cyan: 1.0,
                        yellow: -1.0,
                        toe: 0.5,
                        shoulder: 0.5,
                        ..ExposureSettings::default()
                    };
                    let params = ExposureParams::from_settings(&settings, mode);
                    for i in 0..=32 {
                        let x = i as f32 / 32.0;
                        for v in params.eval([x, 1.0 - x, 0.5]) {
                            assert!(v.is_finite() && (0.0..=1.0).contains(&v));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_geometry_identity_and_inverse_rotation() {
        let img = negative(12, 7, 0.9);
        let id = GeometryTransform::new(0, 0.0, false, false, 12, 7);
        assert_eq!(id.apply(&img).unwrap(), img);

        for k in 1..4 {
            let turned = GeometryTransform::new(k, 0.0, false, false, 12, 7).apply(&img).unwrap();
            let (w, h) = turned.dimensions();
            let back = GeometryTransform::new(4 - k, 0.0, false, false, w, h)
                .apply(&turned)
                .unwrap();
            assert_eq!(back, img, "k = {k}");
        }
    }

    #[test]
    fn test_roll_robust_to_outlier_frame() {
        let good: Vec<_> = [0.60, 0.62, 0.58, 0.61].iter().map(|&e| negative(32, 32, e)).collect();
        let reference = analyze_roll(&good, ProcessMode::C41).unwrap();

        let mut frames = good.clone();
        frames.push(negative(32, 32, 0.004));
        let robust = analyze_roll(&frames, ProcessMode::C41).unwrap();
        for c in 0..3 {
            assert!((robust.floors[c] - reference.floors[c]).abs() < 0.02);
            assert!((robust.ceils[c] - reference.ceils[c]).abs() < 0.02);
        }
    }

    #[test]
    fn test_roll_profile_used_for_every_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roll.yaml");
        let frames: Vec<_> = [0.5, 0.55, 0.6].iter().map(|&e| negative(24, 24, e)).collect();
        let mut settings = full_frame();
        Roll::analyze("test", &frames, &settings).unwrap().save(&path).unwrap();

        settings.process.use_roll_average = true;
        let roll = Roll::from_file(&path).unwrap();
        let pipeline = Pipeline::new(settings.clone()).with_roll(roll.clone());
        let a = pipeline.run(&frames[0]).unwrap();
        let b = pipeline.run(&frames[2]).unwrap();
        assert_eq!(a.bounds, b.bounds);

        // per-frame exposure edits still apply on top of the roll bounds
        settings.exposure.grade += 3.0;
        settings.exposure.density = 1.5;
        let edited = Pipeline::new(settings).with_roll(roll).run(&frames[0]).unwrap();
        assert_eq!(edited.bounds, a.bounds);
        assert_ne!(edited.image, a.image);
    }

    #[test]
    fn test_dust_detected_and_healed() {
        let mut img = ImageBuffer::filled(64, 64, ColorDomain::LinearTransmittance, [0.4; 3]);
        img.set_pixel(41, 17, [0.95; 3]);

        let found = detect_dust(&img, 1.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location, (41, 17));

        let spots: Vec<_> = found.iter().map(|c| c.to_spot(64, 64)).collect();
        let healed = apply_heal(&img, &spots).unwrap();
        assert!((healed.pixel(41, 17)[0] - 0.4).abs() < 1e-3);
        assert!(detect_dust(&healed, 1.0).is_empty());
    }

    #[test]
    fn test_pipeline_dust_removal_counts_spots() {
        let mut scan = ImageBuffer::filled(64, 64, ColorDomain::LinearTransmittance, [0.3, 0.2, 0.12]);
        scan.set_pixel(10, 50, [0.9, 0.9, 0.9]);
        let mut settings = full_frame();
        settings.retouch.dust_remove = true;
        let dev = Pipeline::new(settings).run(&scan).unwrap();
        assert!(dev.dust_spots >= 1);
    }

    /// Spots are a fold: healing a list equals healing one spot at a time.
    #[test]
    fn test_heal_is_sequential_fold() {
        let mut img = ImageBuffer::filled(48, 48, ColorDomain::LinearTransmittance, [0.3; 3]);
        for x in 18..30 {
            img.set_pixel(x, 24, [0.9; 3]);
        }
        let a = RetouchSpot::manual([0.42, 0.51], 0.08);
        let b = RetouchSpot::manual([0.56, 0.51], 0.08);

        let together = apply_heal(&img, &[a, b]).unwrap();
        let one_by_one = apply_heal(&apply_heal(&img, &[a]).unwrap(), &[b]).unwrap();
        assert_eq!(together, one_by_one);
        assert_eq!(apply_heal(&img, &[]).unwrap(), img);
    }

    #[test]
    fn test_manual_heal_consistent_across_resolutions() {
        let spot = RetouchSpot::manual([0.5, 0.5], 0.08);
        for size in [64, 128] {
            let img = ImageBuffer::from_fn(size, size, ColorDomain::LinearTransmittance, |x, y| {
                let dx = (x as f32 + 0.5) / size as f32 - 0.5;
                let dy = (y as f32 + 0.5) / size as f32 - 0.5;
                if (dx * dx + dy * dy).sqrt() < 0.02 { [0.9; 3] } else { [0.3; 3] }
            });
            let healed = apply_heal(&img, &[spot]).unwrap();
            let c = size / 2;
            assert!((healed.pixel(c, c)[0] - 0.3).abs() < 1e-3, "size {size}");
            // outside the spot nothing moves
            assert_eq!(healed.pixel(2, 2), img.pixel(2, 2));
        }
    }

    #[test]
    fn test_toning_masks_bounded() {
        for strength in [0.0, 0.4, 1.0] {
            for i in 0..=50 {
                let y = i as f32 / 50.0;
                assert!((0.0..=strength + 1e-6).contains(&selenium_mask(y, strength)));
                assert!((0.0..=strength + 1e-6).contains(&sepia_mask(y, strength)));
            }
            assert_relative_eq!(selenium_mask(0.0, strength), strength);
            assert_relative_eq!(sepia_mask(SEPIA_CENTER, strength), strength);
        }
    }

    /// The same settings give the same print on any thread count.
    #[test]
    fn test_pipeline_deterministic_across_pools() {
        let mut scan = negative(64, 48, 0.7);
        scan.set_pixel(30, 20, [0.95; 3]);
        let mut settings = full_frame();
        settings.retouch.dust_remove = true;
        settings.lab.chroma_denoise = 0.3;
        settings.lab.vibrance = 1.2;
        settings.lab.clahe_strength = 0.4;
        settings.lab.sharpen = 0.5;
        settings.toning.sepia_strength = 0.3;

        let render = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| run_pipeline(&scan, &settings, ProcessMode::C41).unwrap())
        };
        assert_eq!(render(1), render(4));
    }

    #[test]
    fn test_render_session_keeps_newest() {
        let session = RenderSession::new();
        let pipeline = Pipeline::new(full_frame());
        let scan = negative(24, 16, 0.6);

        let stale = session.begin();
        let fresh = session.render(&pipeline, &scan).unwrap();
        assert!(fresh.is_some());
        assert!(session.deliver(stale, ()).is_none());

        std::thread::scope(|s| {
            let older = session.begin();
            let handle = s.spawn(|| pipeline.run(&scan).unwrap());
            let newer = session.begin();
            let result = handle.join().unwrap();
            assert!(session.deliver(older, result.clone()).is_none());
            assert!(session.deliver(newer, result).is_some());
        });
    }
}
