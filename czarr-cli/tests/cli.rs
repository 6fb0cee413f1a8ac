// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;
use std::sync::Arc;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;
use zarrs::storage::ReadableWritableListableStorage;

use czarr_core::im::{PixelArray, PixelBuffer};

const SIZE: usize = 20;

/// A `SIZE x SIZE` background of 10 with bright 4x4 spots at the given corners
fn spots(corners: &[(usize, usize)]) -> Vec<u16> {
    let mut values = vec![10u16; SIZE * SIZE];
    for &(r0, c0) in corners {
        for r in r0..r0 + 4 {
            for c in c0..c0 + 4 {
                values[r * SIZE + c] = 500;
            }
        }
    }
    values
}

fn write_image(path: &Path, corners: &[(usize, usize)]) {
    PixelArray::from(PixelBuffer::new(&[SIZE, SIZE], spots(corners)).unwrap())
        .save(path)
        .unwrap();
}

fn write_config(path: &Path, measure: bool) {
    let config = format!(
        r#"{{"threshold": {{"method": "value", "value": 100}}, "label": {{"measure_params": {}}}}}"#,
        measure
    );
    std::fs::write(path, config).unwrap();
}

fn attributes(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().unwrap().clone()
}

/// A two well NGFF 0.5 plate with one (c, y, x) field per well
fn write_plate(path: &Path) {
    let store: ReadableWritableListableStorage = Arc::new(FilesystemStore::new(path).unwrap());

    GroupBuilder::new()
        .attributes(attributes(serde_json::json!({
            "ome": {
                "version": "0.5",
                "plate": {
                    "name": "test-plate",
                    "rows": [{"name": "A"}, {"name": "B"}],
                    "columns": [{"name": "1"}, {"name": "2"}],
                    "wells": [
                        {"path": "A/1", "rowIndex": 0, "columnIndex": 0},
                        {"path": "B/2", "rowIndex": 1, "columnIndex": 1}
                    ]
                }
            }
        })))
        .build(store.clone(), "/")
        .unwrap()
        .store_metadata()
        .unwrap();

    let wells: [(&str, &str, Vec<(usize, usize)>); 2] = [
        ("A", "A/1", vec![(3, 3), (12, 12)]),
        ("B", "B/2", vec![(8, 8)]),
    ];

    for (row, well, corners) in wells {
        GroupBuilder::new()
            .build(store.clone(), &format!("/{}", row))
            .unwrap()
            .store_metadata()
            .unwrap();

        GroupBuilder::new()
            .attributes(attributes(serde_json::json!({
                "ome": {"version": "0.5", "well": {"images": [{"path": "0"}]}}
            })))
            .build(store.clone(), &format!("/{}", well))
            .unwrap()
            .store_metadata()
            .unwrap();

        GroupBuilder::new()
            .attributes(attributes(serde_json::json!({
                "ome": {
                    "version": "0.5",
                    "multiscales": [{
                        "axes": [
                            {"name": "c", "type": "channel"},
                            {"name": "y", "type": "space"},
                            {"name": "x", "type": "space"}
                        ],
                        "datasets": [{"path": "0"}]
                    }]
                }
            })))
            .build(store.clone(), &format!("/{}/0", well))
            .unwrap()
            .store_metadata()
            .unwrap();

        let array = ArrayBuilder::new(
            vec![2, SIZE as u64, SIZE as u64],
            DataType::UInt16,
            vec![1u64, SIZE as u64, SIZE as u64].try_into().unwrap(),
            FillValue::from(0u16),
        )
        .build(store.clone(), &format!("/{}/0/0", well))
        .unwrap();

        array.store_metadata().unwrap();

        let mut data = spots(&corners);
        data.extend(vec![10u16; SIZE * SIZE]);

        array
            .store_array_subset_elements::<u16>(&array.subset_all(), &data)
            .unwrap();
    }
}

fn czarr() -> Command {
    Command::cargo_bin("czarr").unwrap()
}

#[test]
fn test_process_single_image() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("spots.npy");
    let config = dir.path().join("config.json");

    write_image(&image, &[(3, 3), (3, 12), (12, 7)]);
    write_config(&config, true);

    czarr()
        .args(["process", "-i"])
        .arg(&image)
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("spots\t3"));
}

#[test]
fn test_process_directory() {
    let dir = TempDir::new().unwrap();
    let images = dir.path().join("images");
    let output = dir.path().join("output");
    let config = dir.path().join("config.json");

    std::fs::create_dir(&images).unwrap();
    write_image(&images.join("a.npy"), &[(3, 3), (12, 12)]);
    write_image(&images.join("b.npy"), &[(8, 8)]);
    write_config(&config, true);

    czarr()
        .args(["process", "--save-labels", "-i"])
        .arg(&images)
        .arg("-o")
        .arg(&output)
        .arg("-c")
        .arg(&config)
        .assert()
        .success();

    let counts = std::fs::read_to_string(output.join("counts.csv")).unwrap();
    assert!(counts.contains("a,2"));
    assert!(counts.contains("b,1"));

    let objects = std::fs::read_to_string(output.join("objects.csv")).unwrap();
    assert!(objects.starts_with("image,label"));
    assert_eq!(objects.lines().count(), 4);

    assert!(output.join("a_labels.npy").is_file());
    assert!(output.join("b_overlay.png").is_file());
}

#[test]
fn test_process_directory_skips_saved_labels() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    write_image(&dir.path().join("a.npy"), &[(3, 3), (12, 12)]);
    write_image(&dir.path().join("b.npy"), &[(8, 8)]);
    write_config(&config, false);

    for _ in 0..2 {
        czarr()
            .args(["process", "--save-labels", "-i"])
            .arg(dir.path())
            .arg("-o")
            .arg(dir.path())
            .arg("-c")
            .arg(&config)
            .assert()
            .success();
    }

    let counts = std::fs::read_to_string(dir.path().join("counts.csv")).unwrap();
    assert_eq!(counts.lines().count(), 3);
    assert!(!counts.contains("a_labels"));
    assert!(!dir.path().join("object_errors.tsv").exists());
}

#[test]
fn test_process_directory_requires_output() {
    let dir = TempDir::new().unwrap();
    write_image(&dir.path().join("a.npy"), &[(3, 3)]);

    czarr()
        .args(["process", "-i"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("[czarr::process] ERROR"));
}

#[test]
fn test_process_invalid_config() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("spots.npy");
    let config = dir.path().join("config.json");

    write_image(&image, &[(3, 3)]);
    std::fs::write(
        &config,
        r#"{"threshold": {"method": "value", "value": 3, "invert_result": "yes"}}"#,
    )
    .unwrap();

    czarr()
        .args(["process", "-i"])
        .arg(&image)
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ValueError"));
}

#[test]
fn test_background() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("spots.npy");
    let output = dir.path().join("background.npy");

    write_image(&image, &[(8, 8)]);

    czarr()
        .args(["background", "--radius", "3", "--light-bg", "-i"])
        .arg(&image)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let subtracted = PixelArray::open(&output).unwrap();
    assert_eq!(subtracted.shape(), vec![SIZE, SIZE]);
}

#[test]
fn test_background_invalid_element() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("spots.npy");

    write_image(&image, &[(8, 8)]);

    czarr()
        .args(["background", "--elem", "cube", "-i"])
        .arg(&image)
        .arg("-o")
        .arg(dir.path().join("background.npy"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"));
}

#[test]
fn test_plate() {
    let dir = TempDir::new().unwrap();
    let plate = dir.path().join("plate.ome.zarr");
    let output = dir.path().join("results");
    let config = dir.path().join("config.json");

    write_plate(&plate);
    write_config(&config, true);

    czarr()
        .args(["plate", "-i"])
        .arg(&plate)
        .arg("-o")
        .arg(&output)
        .arg("-c")
        .arg(&config)
        .assert()
        .success();

    let fields = std::fs::read_to_string(output.join("fields.csv")).unwrap();
    assert!(fields.starts_with("well,row,column,field,objects"));
    assert!(fields.contains("A/1,A,1,0,2"));
    assert!(fields.contains("B/2,B,2,0,1"));

    let heatmap = std::fs::read_to_string(output.join("heatmap.csv")).unwrap();
    assert!(heatmap.contains("A,2,"));
    assert!(heatmap.contains("B,,1"));

    let objects = std::fs::read_to_string(output.join("objects.csv")).unwrap();
    assert!(objects.starts_with("well,field,label"));
    assert_eq!(objects.lines().count(), 4);
}

#[test]
fn test_plate_channel_out_of_range() {
    let dir = TempDir::new().unwrap();
    let plate = dir.path().join("plate.ome.zarr");
    let output = dir.path().join("results");
    let config = dir.path().join("config.json");

    write_plate(&plate);
    write_config(&config, false);

    czarr()
        .args(["plate", "--channel", "3", "-i"])
        .arg(&plate)
        .arg("-o")
        .arg(&output)
        .arg("-c")
        .arg(&config)
        .assert()
        .success();

    let errors = std::fs::read_to_string(output.join("field_errors.tsv")).unwrap();
    assert_eq!(errors.lines().count(), 2);
    assert!(!output.join("objects.csv").exists());
}
