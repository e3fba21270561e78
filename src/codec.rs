use crate::error::CodecError;
use crate::ids::FilePathId;

const RECORD: usize = 8;

/// Concatenated 8-byte [`FilePathId`] records.
pub fn file_path_ids_pack(ids: &[FilePathId]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ids.len() * RECORD);
    for id in ids {
        out.extend_from_slice(&id.to_bytes());
    }
    out
}

pub fn file_path_ids_unpack(bytes: &[u8]) -> Result<Vec<FilePathId>, CodecError> {
    if bytes.len() % RECORD != 0 {
        return Err(CodecError::Length {
            expected: bytes.len() / RECORD * RECORD + RECORD,
            actual: bytes.len(),
        });
    }

    Ok(bytes
        .chunks_exact(RECORD)
        .map(|chunk| {
            let mut arr = [0u8; RECORD];
            arr.copy_from_slice(chunk);
            FilePathId::from_bytes(arr)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_records_back_to_back() {
        let packed = file_path_ids_pack(&[FilePathId::new(1, 2), FilePathId::new(3, 4)]);
        assert_eq!(packed.len(), 16);
        assert_eq!(&packed[8..12], &[3, 0, 0, 0]);

        let ids = file_path_ids_unpack(&packed).unwrap();
        assert_eq!(ids, [FilePathId::new(1, 2), FilePathId::new(3, 4)]);
    }

    #[test]
    fn ragged_input_is_rejected() {
        assert_eq!(
            file_path_ids_unpack(&[0u8; 12]),
            Err(CodecError::Length { expected: 16, actual: 12 })
        );
        assert!(file_path_ids_unpack(&[]).unwrap().is_empty());
    }

    #[test]
    fn negative_records_unpack_invalid() {
        let mut packed = file_path_ids_pack(&[FilePathId::new(0, 0)]);
        packed[..4].copy_from_slice(&(-5i32).to_le_bytes());
        let ids = file_path_ids_unpack(&packed).unwrap();
        assert!(!ids[0].is_valid());
    }
}
