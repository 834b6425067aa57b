use std::path::Path;

fn write_npy(path: &Path, shape: &str, values: &[f32]) {
    let mut header =
        format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape}, }}").into_bytes();
    while (header.len() + 11) % 64 != 0 {
        header.push(b' ');
    }
    header.push(b'\n');

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"\x93NUMPY");
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&header);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create npy parent dirs");
    }
    std::fs::write(path, bytes).expect("write npy fixture");
}

pub fn write_vector_npy(path: &Path, values: &[f32]) {
    write_npy(path, &format!("({},)", values.len()), values);
}

pub fn write_matrix_npy(path: &Path, rows: usize, cols: usize, values: &[f32]) {
    assert_eq!(values.len(), rows * cols);
    write_npy(path, &format!("({rows}, {cols})"), values);
}
