// Block transfer scenarios against a temporary mount point.

#[cfg(test)]
mod tests {
    use crate::core_auth::{AuthContext, TrustedAuthBackend};
    use crate::core_block::{DataBlock, RestartMarker};
    use crate::core_dir::VirtualDirectory;
    use crate::core_error::VfsError;
    use crate::core_file::{TransferParams, VirtualFile};
    use bytes::Bytes;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, AuthContext, VirtualDirectory) {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("user")).unwrap();
        let mut auth = AuthContext::new(
            &tmp.path().to_string_lossy(),
            Arc::new(TrustedAuthBackend::new()),
        );
        auth.set_user("user").unwrap();
        let mut dir = VirtualDirectory::new(true);
        dir.init_after_identification(&auth);
        (tmp, auth, dir)
    }

    fn real(tmp: &TempDir, name: &str) -> PathBuf {
        tmp.path().join("user").join(name)
    }

    fn params(block_size: usize) -> TransferParams {
        TransferParams {
            block_size,
            delete_on_abort: false,
        }
    }

    fn block(data: &'static [u8], eof: bool) -> DataBlock {
        let mut block = DataBlock::from_payload(data);
        block.set_eof(eof);
        block
    }

    #[test]
    fn test_append_starts_at_end() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "f.bin"), vec![7u8; 50]).unwrap();
        let mut file = dir.set_file(&auth, "f.bin", true, &params(16)).unwrap();
        assert_eq!(file.position(), 50);
        file.write_data_block(&block(b"0123456789", false)).unwrap();
        assert_eq!(file.position(), 60);
        assert_eq!(fs::metadata(real(&tmp, "f.bin")).unwrap().len(), 60);
    }

    #[test]
    fn test_overwrite_truncates() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "f.bin"), vec![7u8; 50]).unwrap();
        let mut file = dir.set_file(&auth, "f.bin", false, &params(16)).unwrap();
        assert_eq!(file.position(), 0);
        file.write_data_block(&block(b"abc", true)).unwrap();
        assert_eq!(fs::read(real(&tmp, "f.bin")).unwrap(), b"abc");
        assert!(!file.is_ready());
    }

    #[test]
    fn test_missing_file_is_ready_before_first_write() {
        let (tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "new.bin", true, &params(16)).unwrap();
        assert!(file.is_ready());
        assert!(!file.exists());
        assert!(file.can_write());
        assert!(!file.is_in_writing());
        assert_eq!(file.position(), 0);
        file.write_data_block(&block(b"hi", false)).unwrap();
        assert!(file.is_in_writing());
        file.write_data_block(&block(b"!", true)).unwrap();
        assert_eq!(fs::read(real(&tmp, "new.bin")).unwrap(), b"hi!");
    }

    #[test]
    fn test_empty_block_still_creates_file() {
        let (tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "empty", false, &params(16)).unwrap();
        file.write_data_block(&block(b"", true)).unwrap();
        assert_eq!(fs::metadata(real(&tmp, "empty")).unwrap().len(), 0);
    }

    #[test]
    fn test_read_blocks_until_short_block() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "data"), b"0123456789").unwrap();
        let mut file = dir.set_file(&auth, "data", false, &params(4)).unwrap();

        let first = file.read_data_block().unwrap();
        assert_eq!(first.unread(), Bytes::from_static(b"0123"));
        assert!(!first.is_eof());
        assert!(file.is_in_reading());
        assert_eq!(file.position(), 4);

        let second = file.read_data_block().unwrap();
        assert_eq!(second.unread(), Bytes::from_static(b"4567"));

        let last = file.read_data_block().unwrap();
        assert_eq!(last.unread(), Bytes::from_static(b"89"));
        assert!(last.is_eof());
        assert!(!file.is_ready());
        assert_eq!(file.business_path(), "/user/data");

        assert!(matches!(
            file.read_data_block(),
            Err(VfsError::FileNotReady(_))
        ));
    }

    #[test]
    fn test_read_exact_multiple_ends_with_end_of_transfer() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "data"), b"01234567").unwrap();
        let mut file = dir.set_file(&auth, "data", false, &params(4)).unwrap();
        assert_eq!(file.read_data_block().unwrap().byte_count(), 4);
        assert_eq!(file.read_data_block().unwrap().byte_count(), 4);
        let err = file.read_data_block().unwrap_err();
        assert!(err.is_end_of_transfer());
        assert!(!file.is_ready());
    }

    #[test]
    fn test_read_missing_file_fails_and_closes() {
        let (_tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "ghost", false, &params(4)).unwrap();
        let err = file.read_data_block().unwrap_err();
        assert!(err.is_transient());
        assert!(!file.is_ready());
    }

    #[test]
    fn test_retrieve_from_restart_marker() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "data"), b"0123456789").unwrap();
        let mut file = dir.set_file(&auth, "data", false, &params(16)).unwrap();
        let mut marker = RestartMarker::new();
        marker.arm(6, None);
        assert!(file.retrieve(&mut marker).unwrap());
        assert!(!marker.is_armed());
        assert_eq!(file.position(), 6);
        let tail = file.read_data_block().unwrap();
        assert_eq!(tail.unread(), Bytes::from_static(b"6789"));
        assert!(tail.is_eof());

        // the same file can be downloaded again from the start
        file.retrieve(&mut marker).unwrap();
        assert_eq!(file.read_data_block().unwrap().byte_count(), 10);
    }

    #[test]
    fn test_store_from_restart_marker_truncates() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "data"), b"0123456789").unwrap();
        let mut file = dir.set_file(&auth, "data", false, &params(16)).unwrap();
        let mut marker = RestartMarker::new();
        marker.arm(4, None);
        file.store(&mut marker).unwrap();
        file.write_data_block(&block(b"XY", true)).unwrap();
        assert_eq!(fs::read(real(&tmp, "data")).unwrap(), b"0123XY");
    }

    #[test]
    fn test_restart_beyond_end_fails_on_write() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "data"), b"0123456789").unwrap();
        let mut file = dir.set_file(&auth, "data", false, &params(16)).unwrap();
        let mut marker = RestartMarker::new();
        marker.arm(20, None);
        assert!(file.restart_marker(&mut marker).unwrap());
        assert!(file.write_data_block(&block(b"XY", false)).is_err());
        assert!(!file.is_ready());
        assert_eq!(fs::read(real(&tmp, "data")).unwrap(), b"0123456789");
    }

    #[test]
    fn test_unarmed_marker_leaves_position() {
        let (_tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "x", false, &params(16)).unwrap();
        let mut marker = RestartMarker::new();
        assert!(!file.restart_marker(&mut marker).unwrap());
        assert_eq!(file.position(), 0);
    }

    #[test]
    fn test_set_position_reopens_output() {
        let (tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "pos", false, &params(16)).unwrap();
        file.write_data_block(&block(b"abcdef", false)).unwrap();
        file.set_position(2).unwrap();
        assert!(file.is_in_writing());
        file.write_data_block(&block(b"Z", true)).unwrap();
        assert_eq!(fs::read(real(&tmp, "pos")).unwrap(), b"abZ");
    }

    #[test]
    fn test_partial_block_offset_is_honoured() {
        let (tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "off", false, &params(16)).unwrap();
        let mut data = DataBlock::from_payload(&b"skipkeep"[..]);
        data.add_offset(4);
        data.set_eof(true);
        file.write_data_block(&data).unwrap();
        assert_eq!(fs::read(real(&tmp, "off")).unwrap(), b"keep");
    }

    #[test]
    fn test_rename() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "a.txt"), b"content").unwrap();
        fs::write(real(&tmp, "taken"), b"other").unwrap();
        let mut file = dir.set_file(&auth, "a.txt", false, &params(16)).unwrap();

        assert!(file.rename_to(&dir, &auth, "a.txt").unwrap());
        assert!(!file.rename_to(&dir, &auth, "taken").unwrap());
        assert!(!file.rename_to(&dir, &auth, "missing/b.txt").unwrap());
        assert!(matches!(
            file.rename_to(&dir, &auth, "../b.txt"),
            Err(VfsError::PathOutsideSandbox(_))
        ));

        assert!(file.rename_to(&dir, &auth, "b.txt").unwrap());
        assert_eq!(file.business_path(), "/user/b.txt");
        assert!(file.is_ready());
        assert!(!real(&tmp, "a.txt").exists());
        assert_eq!(fs::read(real(&tmp, "b.txt")).unwrap(), b"content");
    }

    #[test]
    fn test_rename_unready_file_is_refused() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "a.txt"), b"content").unwrap();
        let mut file = dir.set_file(&auth, "a.txt", false, &params(16)).unwrap();
        file.close_file();
        assert!(!file.rename_to(&dir, &auth, "b.txt").unwrap());
        assert!(real(&tmp, "a.txt").exists());
    }

    #[test]
    fn test_delete() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "gone"), b"x").unwrap();
        let mut file = dir.set_file(&auth, "gone", false, &params(16)).unwrap();
        assert!(file.delete().unwrap());
        assert!(!real(&tmp, "gone").exists());
        assert!(!file.is_ready());
        assert!(!file.delete().unwrap());

        let mut missing = VirtualFile::new(&dir, &auth, "never", false, &params(16)).unwrap();
        assert!(missing.delete().unwrap());
    }

    #[test]
    fn test_abort_keeps_partial_upload_by_default() {
        let (tmp, auth, dir) = fixture();
        let mut file = VirtualFile::new(&dir, &auth, "part", false, &params(16)).unwrap();
        file.write_data_block(&block(b"half", false)).unwrap();
        file.abort_file();
        assert!(!file.is_ready());
        assert_eq!(fs::read(real(&tmp, "part")).unwrap(), b"half");
    }

    #[test]
    fn test_abort_deletes_when_configured() {
        let (tmp, auth, dir) = fixture();
        let params = TransferParams {
            block_size: 16,
            delete_on_abort: true,
        };
        let mut file = VirtualFile::new(&dir, &auth, "part", false, &params).unwrap();
        file.write_data_block(&block(b"half", false)).unwrap();
        file.abort_file();
        assert!(!file.is_ready());
        assert!(!real(&tmp, "part").exists());

        // nothing is deleted when the file is not being written
        fs::write(real(&tmp, "kept"), b"x").unwrap();
        let mut reader = VirtualFile::new(&dir, &auth, "kept", false, &params).unwrap();
        reader.abort_file();
        assert!(real(&tmp, "kept").exists());
    }

    #[test]
    fn test_length_and_predicates() {
        let (tmp, auth, dir) = fixture();
        fs::write(real(&tmp, "sized"), vec![0u8; 12]).unwrap();
        let mut file = dir.set_file(&auth, "sized", false, &params(16)).unwrap();
        assert_eq!(file.length().unwrap(), 12);
        assert!(file.is_file());
        assert!(!file.is_directory());
        assert!(file.can_read());
        file.close_file();
        assert!(matches!(file.length(), Err(VfsError::FileNotReady(_))));
        assert!(!file.exists());
        assert!(!file.can_read());

        let ghost = VirtualFile::new(&dir, &auth, "ghost", false, &params(16)).unwrap();
        assert!(matches!(ghost.length(), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_path_outside_root_is_rejected() {
        let (_tmp, auth, dir) = fixture();
        assert!(matches!(
            VirtualFile::new(&dir, &auth, "../../etc/passwd", false, &params(16)),
            Err(VfsError::PathOutsideSandbox(_))
        ));
    }
}
