use approx::assert_abs_diff_eq;
use ndarray::Array2;
use rcmcal::config::check_external_aux_file;
use rcmcal::core::{calibrate_raster, passthrough_tile, TiePointGrid};
use rcmcal::io::{load_lut_dir, read_lut_file};
use rcmcal::{
    CalibrationMode, Calibrator, GainLutMap, GainLutParams, IncidenceAngleMode, OutputOptions, Polarization,
    ProductInfo, SampleUnit, SarError, SourceTile, TileBuffer, TileBufferMut, TileConfig, TileWindow,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const WIDTH: usize = 300;
const HEIGHT: usize = 170;

fn lut_xml(step: usize, count: usize, offset: f64) -> String {
    let gains: Vec<String> = (0..count).map(|i| format!("{:e}", 1.0 + i as f64 * 0.5)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<lut xmlns="rcmGsProductSchema">
  <pixelFirstLutValue>0</pixelFirstLutValue>
  <stepSize>{}</stepSize>
  <numberOfValues>{}</numberOfValues>
  <offset>{}</offset>
  <gains>{}</gains>
</lut>"#,
        step,
        count,
        offset,
        gains.join(" ")
    )
}

fn write_calibration_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("lutSigma_HH.xml"), lut_xml(10, 40, 25.0)).unwrap();
    std::fs::write(dir.path().join("lutSigma_HV.xml"), lut_xml(50, 8, 0.0)).unwrap();
    std::fs::write(dir.path().join("lutBeta_HH.xml"), lut_xml(10, 40, 0.0)).unwrap();
    std::fs::write(dir.path().join("noiseLevels.txt"), "not a LUT").unwrap();
    dir
}

fn detected_scene() -> Array2<f32> {
    Array2::from_shape_fn((HEIGHT, WIDTH), |(r, c)| 1.0 + ((r * 7 + c * 3) % 50) as f32)
}

#[test]
fn test_lut_dir_loading() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = write_calibration_dir();

    let luts = load_lut_dir(dir.path()).expect("LUT directory should load");
    assert_eq!(luts.len(), 2);
    assert_eq!(luts.get(Polarization::HH).unwrap().offset(), 25.0);
    assert_eq!(luts.get(Polarization::HV).unwrap().step(), 50);

    let params = read_lut_file(dir.path().join("lutSigma_HV.xml")).unwrap();
    assert_eq!(params.count, 8);
    assert!(matches!(read_lut_file(dir.path().join("missing.xml")), Err(SarError::Io(_))));
}

#[test]
fn test_external_aux_file_not_accepted() {
    let dir = write_calibration_dir();
    let aux = dir.path().join("lutSigma_HH.xml");
    assert!(matches!(check_external_aux_file(Some(aux.as_path())), Err(SarError::Configuration(_))));
}

#[test]
fn test_raster_matches_single_tile() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = write_calibration_dir();
    let calibrator = Calibrator::new(load_lut_dir(dir.path()).unwrap(), CalibrationMode::default()).unwrap();

    let scene = detected_scene();
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));

    let mut whole = Array2::<f64>::zeros((HEIGHT, WIDTH));
    calibrator
        .calibrate_tile(
            &source,
            &mut TileBufferMut::new(whole.view_mut(), (0, 0)),
            TileWindow::new(0, 0, WIDTH, HEIGHT),
            SampleUnit::Intensity,
            SampleUnit::Intensity,
            Polarization::HH,
        )
        .unwrap();

    let mut tiled = Array2::<f64>::zeros((HEIGHT, WIDTH));
    let config = TileConfig {
        tile_width: 64,
        tile_height: 48,
    };
    calibrate_raster(
        &calibrator,
        &source,
        &mut TileBufferMut::new(tiled.view_mut(), (0, 0)),
        SampleUnit::Intensity,
        SampleUnit::Intensity,
        Polarization::HH,
        &config,
        None,
    )
    .unwrap();

    assert_eq!(whole, tiled);

    // column 123 => gain 1 + 12 * 0.5
    let expected = (scene[[5, 123]] as f64 + 25.0) / 7.0;
    assert_abs_diff_eq!(tiled[[5, 123]], expected, epsilon = 1e-9);
}

#[test]
fn test_subset_raster_uses_absolute_columns() {
    let dir = write_calibration_dir();
    let product = ProductInfo {
        mission: "RCM".to_string(),
        product_type: "GRD".to_string(),
        subset_offset_x: 40,
        subset_offset_y: 10,
    };
    let mode = CalibrationMode::from_product(&product, OutputOptions::default()).unwrap();
    let calibrator = Calibrator::new(load_lut_dir(dir.path()).unwrap(), mode).unwrap();

    let scene = Array2::from_elem((4, 60), 50.0f64);
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));
    let mut out = Array2::<f64>::zeros((4, 60));
    calibrator
        .calibrate_tile(
            &source,
            &mut TileBufferMut::new(out.view_mut(), (0, 0)),
            TileWindow::new(0, 0, 60, 4),
            SampleUnit::Intensity,
            SampleUnit::Intensity,
            Polarization::HV,
        )
        .unwrap();

    // local columns 0..10 sit at absolute 40..50 (gain 1), 10.. at 50.. (gain 1.5)
    assert_abs_diff_eq!(out[[0, 9]], 50.0, epsilon = 1e-12);
    assert_abs_diff_eq!(out[[3, 10]], 50.0 / 1.5, epsilon = 1e-12);
}

#[test]
fn test_complex_raster_to_db() {
    let luts = GainLutMap::from_params(vec![(
        Polarization::CH,
        GainLutParams {
            first_index: 0,
            step: WIDTH as i64,
            count: 1,
            offset: 0.0,
            values: vec![10.0],
        },
    )])
    .unwrap();
    let mode = CalibrationMode {
        is_complex_source: true,
        output_in_db: true,
        ..Default::default()
    };
    let calibrator = Calibrator::new(luts, mode).unwrap();

    let i = Array2::from_elem((HEIGHT, WIDTH), 60.0f32);
    let q = Array2::from_elem((HEIGHT, WIDTH), 80.0f32);
    let source = SourceTile::Complex {
        i: TileBuffer::new(i.view(), (0, 0)),
        q: TileBuffer::new(q.view(), (0, 0)),
    };
    let mut out = Array2::<f32>::zeros((HEIGHT, WIDTH));
    calibrate_raster(
        &calibrator,
        &source,
        &mut TileBufferMut::new(out.view_mut(), (0, 0)),
        SampleUnit::Real,
        SampleUnit::Intensity,
        Polarization::CH,
        &TileConfig::default(),
        None,
    )
    .unwrap();

    // |z|^2 = 10000, / 10^2 = 100 => 20 dB
    assert!(out.iter().all(|&v| (v - 20.0).abs() < 1e-4));
}

#[test]
fn test_cancelled_raster_writes_nothing() {
    let calibrator = Calibrator::new(GainLutMap::new(), CalibrationMode::default()).unwrap();
    let scene = detected_scene();
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));
    let mut out = Array2::<f32>::zeros((HEIGHT, WIDTH));
    let cancel = AtomicBool::new(true);

    let result = calibrate_raster(
        &calibrator,
        &source,
        &mut TileBufferMut::new(out.view_mut(), (0, 0)),
        SampleUnit::Intensity,
        SampleUnit::Intensity,
        Polarization::VV,
        &TileConfig::default(),
        Some(&cancel),
    );

    assert!(matches!(result, Err(SarError::Cancelled)));
    assert!(out.iter().all(|&v| v == 0.0));
}

#[test]
fn test_cancel_mid_run_keeps_finished_tiles() {
    let calibrator = Calibrator::new(GainLutMap::new(), CalibrationMode::default()).unwrap();
    let scene = detected_scene();
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));
    let mut out = Array2::<f64>::zeros((HEIGHT, WIDTH));

    // one band of five column tiles; the third poll cancels
    let config = TileConfig {
        tile_width: 64,
        tile_height: HEIGHT,
    };
    let polls = AtomicUsize::new(0);
    let cancel_on_third = || polls.fetch_add(1, Ordering::SeqCst) >= 2;

    let result = calibrate_raster(
        &calibrator,
        &source,
        &mut TileBufferMut::new(out.view_mut(), (0, 0)),
        SampleUnit::Intensity,
        SampleUnit::Intensity,
        Polarization::VV,
        &config,
        Some(&cancel_on_third),
    );

    assert!(matches!(result, Err(SarError::Cancelled)));
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    for ((r, c), &v) in out.indexed_iter() {
        if c < 128 {
            assert_eq!(v, scene[[r, c]] as f64, "finished tile changed at ({}, {})", r, c);
        } else {
            assert_eq!(v, 0.0, "cancelled tile written at ({}, {})", r, c);
        }
    }
}

#[test]
fn test_zero_tile_size_rejected() {
    let calibrator = Calibrator::new(GainLutMap::new(), CalibrationMode::default()).unwrap();
    let scene = detected_scene();
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));
    let mut out = Array2::<f32>::zeros((HEIGHT, WIDTH));
    let config = TileConfig {
        tile_width: 0,
        tile_height: 16,
    };

    let result = calibrate_raster(
        &calibrator,
        &source,
        &mut TileBufferMut::new(out.view_mut(), (0, 0)),
        SampleUnit::Intensity,
        SampleUnit::Intensity,
        Polarization::VV,
        &config,
        None,
    );
    assert!(matches!(result, Err(SarError::Configuration(_))));
}

#[test]
fn test_out_of_domain_tile_fails() {
    let dir = write_calibration_dir();
    let calibrator = Calibrator::new(load_lut_dir(dir.path()).unwrap(), CalibrationMode::default()).unwrap();

    // HH covers columns 0..400
    let scene = Array2::from_elem((2, 500), 1.0f64);
    let source = SourceTile::Detected(TileBuffer::new(scene.view(), (0, 0)));
    let mut out = Array2::<f64>::zeros((2, 500));
    let result = calibrator.calibrate_tile(
        &source,
        &mut TileBufferMut::new(out.view_mut(), (0, 0)),
        TileWindow::new(380, 0, 40, 2),
        SampleUnit::Intensity,
        SampleUnit::Intensity,
        Polarization::HH,
    );
    assert!(matches!(result, Err(SarError::OutOfDomain { column: 400, .. })));
}

#[test]
fn test_passthrough_with_offset_buffers() {
    let src = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64);
    let mut dst = Array2::<f64>::zeros((4, 4));
    // target buffer holds raster pixels (3..7, 5..9)
    passthrough_tile(
        &TileBuffer::new(src.view(), (0, 0)),
        &mut TileBufferMut::new(dst.view_mut(), (3, 5)),
        TileWindow::new(3, 5, 4, 4),
    )
    .unwrap();
    assert_eq!(dst[[0, 0]], 53.0);
    assert_eq!(dst[[3, 3]], 86.0);
}

#[test]
fn test_point_and_retro_calibration() {
    let dir = write_calibration_dir();
    let product = ProductInfo {
        mission: "RCM".to_string(),
        product_type: "GRD".to_string(),
        subset_offset_x: 0,
        subset_offset_y: 0,
    };
    let output = OutputOptions {
        incidence_angle_mode: IncidenceAngleMode::FromDEM,
        ..Default::default()
    };
    let mode = CalibrationMode::from_product(&product, output).unwrap();
    let calibrator = Calibrator::new(load_lut_dir(dir.path()).unwrap(), mode).unwrap();

    let angles = TiePointGrid::new(Array2::from_elem((3, 3), 30.0), (0.0, 0.0), (100.0, 100.0)).unwrap();
    let angle = rcmcal::core::IncidenceAngleSurface::angle_at(&angles, 35.0, 12.0);

    // column 35 => gain 1 + 3 * 0.5 = 2.5, offset 25
    let sigma = calibrator
        .calibrate_point(75.0, 35.0, 12.0, SampleUnit::Intensity, Polarization::HH, angle)
        .unwrap();
    assert_abs_diff_eq!(sigma, 100.0 / 2.5 * 0.5, epsilon = 1e-9);

    let restored = calibrator.reverse_incidence_correction(sigma, 35.0, 12.0, &angles);
    assert_abs_diff_eq!(restored, 40.0, epsilon = 1e-9);
}

#[test]
fn test_mode_from_json() {
    let mode: CalibrationMode = serde_json::from_str(
        r#"{ "is_complex_source": true, "output_in_db": true, "incidence_angle_mode": "FromDEM" }"#,
    )
    .unwrap();
    assert!(mode.is_complex_source);
    assert!(!mode.output_complex);
    assert_eq!(mode.incidence_angle_mode, IncidenceAngleMode::FromDEM);
    assert_eq!(mode.column_offset, 0);
    assert!(mode.validate().is_ok());
}
