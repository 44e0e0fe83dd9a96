use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, Array3, Axis};
use vggish_core::{
    Dataset, EmbeddingModel, EmbeddingWriter, Error, IdScheme, Pipeline, PipelineOptions,
    Postprocessor, Result, ScanOptions,
};

/// Every embedding value is the example's index within its file.
struct IndexModel;

impl EmbeddingModel for IndexModel {
    fn embed(&mut self, examples: &Array3<f32>) -> Result<Array2<f32>> {
        let n = examples.len_of(Axis(0));
        Ok(Array2::from_shape_fn((n, 128), |(i, _)| i as f32))
    }
}

fn write_wav(path: &Path, seconds: f32, sample_rate: u32, channels: u16) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * sample_rate as f32) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
        for _ in 0..channels {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[test]
fn row_count_matches_examples_processed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    write_wav(&root.join("A/A-15__first.wav"), 2.0, 16_000, 1);
    write_wav(&root.join("A/A-16__second.wav"), 1.2, 22_050, 2);
    write_wav(&root.join("B/B-3__short.wav"), 0.5, 16_000, 1);
    write_wav(&root.join("B/B-4__third.wav"), 3.0, 44_100, 1);

    let dataset = Dataset::scan(&root, &ScanOptions::default()).unwrap();
    assert_eq!(dataset.len(), 4);

    let out = dir.path().join("features.csv");
    let mut writer = EmbeddingWriter::create(&out, 128).unwrap();
    let mut pipeline = Pipeline::new(IndexModel, None, PipelineOptions::default());
    let summary = pipeline.run(&dataset, &mut writer).unwrap();
    drop(writer);

    assert_eq!(summary.files_seen, 4);
    assert_eq!(summary.files_processed, 3);
    assert_eq!(summary.files_skipped_short, 1);
    // 2 s -> 2, 1.2 s -> 1, 3 s -> 3
    assert_eq!(summary.rows_written, 6);
    assert_eq!(summary.rows_per_label["A"], 3);
    assert_eq!(summary.rows_per_label["B"], 3);

    let rows = csv_rows(&out);
    assert_eq!(rows.len(), summary.rows_written);
    assert!(rows.iter().all(|r| r.len() == 130));

    let ids: Vec<_> = rows.iter().map(|r| (r[0].as_str(), r[129].as_str())).collect();
    assert_eq!(
        ids,
        vec![
            ("15", "A"),
            ("15", "A"),
            ("16", "A"),
            ("4", "B"),
            ("4", "B"),
            ("4", "B"),
        ]
    );
    assert_eq!(rows[1][1], "1");
    assert_eq!(rows[5][128], "2");
}

#[test]
fn header_is_written_even_without_rows() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    write_wav(&root.join("A/A-1__tiny.wav"), 0.3, 16_000, 1);

    let dataset = Dataset::scan(&root, &ScanOptions::default()).unwrap();
    let out = dir.path().join("features.csv");
    let mut writer = EmbeddingWriter::create(&out, 128).unwrap();
    let summary = Pipeline::new(IndexModel, None, PipelineOptions::default())
        .run(&dataset, &mut writer)
        .unwrap();
    drop(writer);

    assert_eq!(summary.rows_written, 0);
    let mut reader = csv::Reader::from_path(&out).unwrap();
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 130);
    assert_eq!(&header[0], "filename");
    assert_eq!(&header[129], "label");
    assert_eq!(reader.records().count(), 0);
}

#[test]
fn quantized_rows_are_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    write_wav(&root.join("ship/recording.wav"), 1.0, 16_000, 1);

    let options = ScanOptions {
        id_scheme: IdScheme::Stem,
        ..Default::default()
    };
    let dataset = Dataset::scan(&root, &options).unwrap();

    let pproc = Postprocessor::new(Array2::eye(128), Array1::from_elem(128, 0.5)).unwrap();
    let mut pipeline = Pipeline::new(IndexModel, Some(pproc), PipelineOptions::default());
    let mut writer = EmbeddingWriter::new(Vec::new(), pipeline.output_dims()).unwrap();
    pipeline.run(&dataset, &mut writer).unwrap();

    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    let row = text.lines().nth(1).unwrap();
    let fields: Vec<_> = row.split(',').collect();
    assert_eq!(fields[0], "recording");
    assert_eq!(fields[129], "ship");
    // (0 - 0.5 + 2) * 63.75 = 95.6 -> 95
    assert!(fields[1..129].iter().all(|v| *v == "95"));
}

#[test]
fn unreadable_audio_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir_all(root.join("A")).unwrap();
    fs::write(root.join("A/A-1__broken.wav"), b"not really a wav file").unwrap();

    let dataset = Dataset::scan(&root, &ScanOptions::default()).unwrap();
    let mut writer = EmbeddingWriter::new(Vec::new(), 128).unwrap();
    let err = Pipeline::new(IndexModel, None, PipelineOptions::default())
        .run(&dataset, &mut writer)
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
