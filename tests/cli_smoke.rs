use std::path::PathBuf;

fn bin_path() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_photoreel")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "photoreel.exe"
            } else {
                "photoreel"
            });
            p
        })
}

#[test]
fn cli_frame_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let img = image::RgbaImage::from_pixel(48, 36, image::Rgba([90, 120, 200, 255]));
    img.save(dir.join("catch.png")).unwrap();

    let manifest_path = dir.join("manifest.json");
    let out_path = dir.join("frame.png");
    let _ = std::fs::remove_file(&out_path);

    let manifest = serde_json::json!({
        "seconds_per_frame": 1.0,
        "format": "square",
        "items": [
            {
                "source": "catch.png",
                "label": "Crystal Lake",
                "measurement": 5.2,
                "timestamp": "2026-08-06T09:30:00Z"
            }
        ]
    });
    let f = std::fs::File::create(&manifest_path).unwrap();
    serde_json::to_writer_pretty(f, &manifest).unwrap();

    let manifest_arg = manifest_path.to_string_lossy().to_string();
    let out_arg = out_path.to_string_lossy().to_string();

    let status = std::process::Command::new(bin_path())
        .args(["frame", "--in", manifest_arg.as_str(), "--index", "0", "--out"])
        .arg(out_arg.as_str())
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out_path.exists());

    // The written frame must match the chosen preset exactly.
    let frame = image::open(&out_path).unwrap();
    assert_eq!(frame.width(), 640);
    assert_eq!(frame.height(), 640);
}

#[test]
fn cli_formats_lists_catalog() {
    let output = std::process::Command::new(bin_path())
        .arg("formats")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for key in ["square", "landscape", "portrait", "widescreen"] {
        assert!(stdout.contains(key), "missing '{key}' in:\n{stdout}");
    }
}

#[test]
fn cli_frame_rejects_out_of_range_index() {
    let dir = PathBuf::from("target").join("cli_smoke_bad_index");
    std::fs::create_dir_all(&dir).unwrap();

    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
    img.save(dir.join("only.png")).unwrap();

    let manifest_path = dir.join("manifest.json");
    std::fs::write(
        &manifest_path,
        r#"{ "items": [{ "source": "only.png" }] }"#,
    )
    .unwrap();

    let status = std::process::Command::new(bin_path())
        .args([
            "frame",
            "--in",
            manifest_path.to_string_lossy().as_ref(),
            "--index",
            "5",
            "--out",
        ])
        .arg(dir.join("frame.png").to_string_lossy().as_ref())
        .status()
        .unwrap();

    assert!(!status.success());
}
