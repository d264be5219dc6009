//! Integration tests for result persistence and chart rendering.

use paisaje::report::{
    read_raw_arrays, render_charts, write_raw_arrays, RawArrays, ACC_CHART_FILE, LOSS_CHART_FILE,
    RAW_ARRAYS_FILE,
};
use paisaje::sweep::{linspace, SweepMetrics};

fn metrics(n: usize) -> SweepMetrics {
    let alphas = linspace(-1.0, 2.0, n);
    SweepMetrics {
        test_loss: alphas.iter().map(|a| 1.5 + a * a).collect(),
        test_accuracy: alphas.iter().map(|a| 40.0 + 5.0 * a).collect(),
        train_loss: alphas.iter().map(|a| 0.5 + a * a).collect(),
        train_accuracy: alphas.iter().map(|a| 55.0 + 5.0 * a).collect(),
        alphas,
    }
}

#[test]
fn test_raw_arrays_write_read_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = RawArrays::new(
        &metrics(200),
        "resnet50",
        "runs/a.safetensors",
        "runs/b.safetensors",
    );
    let path = write_raw_arrays(tmp.path(), &raw).unwrap();
    assert_eq!(path.file_name().unwrap(), RAW_ARRAYS_FILE);

    let restored = read_raw_arrays(tmp.path()).unwrap();
    assert_eq!(restored, raw);
    assert_eq!(restored.alphas.len(), 200);
    assert_eq!(restored.alphas[0], -1.0);
    assert_eq!(restored.alphas[199], 2.0);
}

#[test]
fn test_raw_arrays_json_shape() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = RawArrays::new(&metrics(5), "resnet18", "m1", "m2");
    let path = write_raw_arrays(tmp.path(), &raw).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    for key in ["test loss", "test accuracy", "train loss", "train accuracy"] {
        assert_eq!(json[key].as_array().unwrap().len(), 5, "key {key}");
    }
    assert_eq!(json["arch"], "resnet18");
    assert_eq!(json["model1"], "m1");
    assert_eq!(json["model2"], "m2");
}

#[test]
fn test_charts_are_nonempty_svg() {
    let tmp = tempfile::tempdir().unwrap();
    let (loss, acc) = render_charts(tmp.path(), &metrics(50)).unwrap();
    assert_eq!(loss.file_name().unwrap(), LOSS_CHART_FILE);
    assert_eq!(acc.file_name().unwrap(), ACC_CHART_FILE);

    for path in [loss, acc] {
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.len() > 500, "{} too small", path.display());
        assert!(svg.contains("<svg"));
        assert!(svg.contains("</svg>"));
    }
}

#[test]
fn test_missing_output_directory_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("does-not-exist");
    let raw = RawArrays::new(&metrics(3), "resnet18", "m1", "m2");
    assert!(write_raw_arrays(&missing, &raw).is_err());
    assert!(render_charts(&missing, &metrics(3)).is_err());
}
