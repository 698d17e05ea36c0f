use painter3d::io::model_loader::{Model, ModelError};
use painter3d::io::model_writer::ModelWriter;
use painter3d::utils::scene_utils::{DEMO_MOUNT_EDGE, demo_model};
use std::io::Write;

fn header(blocks: &[(u32, u32)]) -> Vec<u8> {
    let mut bytes = b"CCmodel\x1A".to_vec();
    bytes.extend(1u16.to_le_bytes());
    bytes.extend((blocks.len() as u16).to_le_bytes());
    for (kind, size) in blocks {
        bytes.extend(kind.to_le_bytes());
        bytes.extend(size.to_le_bytes());
    }
    bytes
}

fn values(v: &[i16]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

#[test]
fn demo_model_survives_a_file_round_trip() {
    let demo = demo_model(true);
    let path = std::env::temp_dir().join(format!("painter3d-demo-{}.bin", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        ModelWriter::write(&demo, &mut file).unwrap();
        file.flush().unwrap();
    }

    let loaded = Model::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded.meshes().len(), 1);
    assert_eq!(loaded.meshes()[0].triangles(), demo.meshes()[0].triangles());
    assert_eq!(loaded.grids()[0].lines().len(), demo.grids()[0].lines().len());
    assert_eq!(loaded.positions().count(DEMO_MOUNT_EDGE), 3);
    // 2.14 fixed point holds the demo coordinates exactly.
    assert_eq!(loaded, demo);
}

#[test]
fn truncated_file_leaves_no_meshes() {
    let bytes = ModelWriter::to_bytes(&demo_model(false)).unwrap();
    for cut in [5, 12, 30, bytes.len() - 1] {
        let mut model = demo_model(false);
        let err = model.load("cut", &bytes[..cut]).unwrap_err();
        assert!(err.message.contains("unexpected end of file"), "{}", err);
        assert_eq!(model.meshes().len(), 0);
        assert!(model.is_empty());
    }
}

#[test]
fn triangle_index_out_of_range_is_rejected() {
    // One vertex, one triangle referencing vertex 5.
    let mut payload = vec![1, 1];
    payload.extend([0; 9]);
    payload.extend([0, 0, 5]);
    let mut bytes = header(&[(1, (payload.len() * 2) as u32)]);
    bytes.extend(values(&payload));

    let mut model = Model::new();
    let err = model.load("bad-index", bytes.as_slice()).unwrap_err();
    assert_eq!(err.source_name, "bad-index");
    assert!(err.to_string().starts_with("bad-index: "));
    assert!(err.message.contains("index 5 out of range"));
    assert!(model.is_empty());
}

#[test]
fn unknown_blocks_are_skipped() {
    let grid = [1i16, 0, 16384, 0, 0, 0, 0];
    let mut bytes = header(&[(77, 6), (2, (grid.len() * 2) as u32)]);
    bytes.extend([9u8; 6]);
    bytes.extend(values(&grid));

    let mut model = Model::new();
    model.load("mixed", bytes.as_slice()).unwrap();
    assert_eq!(model.grids().len(), 1);
    assert_eq!(model.grids()[0].lines()[0].1.x, 1.0);
}

#[test]
fn missing_file_is_an_io_error() {
    match Model::from_file("/nonexistent/painter3d/model.bin") {
        Err(ModelError::Io { .. }) => {}
        other => panic!("expected an io error, got {:?}", other.map(|m| m.is_empty())),
    }
}
