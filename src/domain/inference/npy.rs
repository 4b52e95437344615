//! NumPy `.npy` v1.0 encoding for little-endian float32 arrays
//!
//! This is the body format the serving container's numpy deserializer
//! expects for `application/x-npy` requests.

use crate::domain::DomainError;

pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic + version + u16 header length
const PREAMBLE_LEN: usize = NPY_MAGIC.len() + 2 + 2;

/// Total header size (preamble included) is padded to this boundary
const HEADER_ALIGNMENT: usize = 64;

/// Encode a C-ordered float32 array with the given shape
pub fn encode_f32(shape: &[usize], data: &[f32]) -> Result<Vec<u8>, DomainError> {
    let expected: usize = shape.iter().product();
    if expected != data.len() {
        return Err(DomainError::transform(format!(
            "Array shape {:?} needs {} elements, got {}",
            shape,
            expected,
            data.len()
        )));
    }

    let header = header_dict("<f4", shape);
    let header_len = u16::try_from(header.len()).map_err(|_| {
        DomainError::transform(format!("NPY header too long: {} bytes", header.len()))
    })?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len() + data.len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());

    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }

    Ok(out)
}

fn header_dict(descr: &str, shape: &[usize]) -> String {
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr,
        shape_tuple(shape)
    );

    // +1 for the terminating newline
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');
    header
}

/// Python tuple literal: `()`, `(3,)`, `(28, 28)`
fn shape_tuple(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
