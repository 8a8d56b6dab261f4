// Directory scenarios against a temporary mount point.

#[cfg(test)]
mod tests {
    use crate::core_auth::{AuthContext, TrustedAuthBackend};
    use crate::core_digest::to_hex;
    use crate::core_dir::VirtualDirectory;
    use crate::core_error::VfsError;
    use crate::core_file::TransferParams;
    use chrono::{Local, TimeZone};
    use filetime::{set_file_mtime, FileTime};
    use std::collections::HashSet;
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

    fn home(tmp: &TempDir) -> PathBuf {
        tmp.path().join("user")
    }

    fn as_set(paths: Vec<String>) -> HashSet<String> {
        paths.into_iter().collect()
    }

    #[test]
    fn test_init_sets_current_dir_to_root() {
        let (_tmp, _auth, dir) = fixture();
        assert_eq!(dir.pwd().unwrap(), "/user");
    }

    #[test]
    fn test_wildcard_by_extension() {
        let (tmp, auth, dir) = fixture();
        for name in ["a.txt", "b.txt", "c.log"] {
            fs::write(home(&tmp).join(name), name).unwrap();
        }
        let txt = dir.wildcard_files(&auth, "/user/*.txt").unwrap();
        assert_eq!(
            as_set(txt),
            as_set(vec!["/user/a.txt".to_string(), "/user/b.txt".to_string()])
        );
        let log = dir
            .wildcard_files(&auth, &dir.consolidate_path("*.log").unwrap())
            .unwrap();
        assert_eq!(log, vec!["/user/c.log".to_string()]);
        assert!(dir.wildcard_files(&auth, "/user/*.none").unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_question_mark_and_class() {
        let (tmp, auth, dir) = fixture();
        for name in ["f1", "f2", "f10", "F1"] {
            fs::write(home(&tmp).join(name), b"").unwrap();
        }
        let single = as_set(dir.wildcard_files(&auth, "/user/f?").unwrap());
        assert_eq!(
            single,
            as_set(vec!["/user/f1".to_string(), "/user/f2".to_string()])
        );
        let class = dir.wildcard_files(&auth, "/user/[F]?").unwrap();
        assert_eq!(class, vec!["/user/F1".to_string()]);
        // a class alone is not a wildcard
        assert_eq!(
            dir.wildcard_files(&auth, "/user/[F]1").unwrap(),
            vec!["/user/[F]1".to_string()]
        );
    }

    #[test]
    fn test_wildcard_across_segments() {
        let (tmp, auth, dir) = fixture();
        for sub in ["d1", "d2", "other"] {
            fs::create_dir(home(&tmp).join(sub)).unwrap();
            fs::write(home(&tmp).join(sub).join("x.bin"), b"x").unwrap();
        }
        let found = as_set(dir.wildcard_files(&auth, "/user/d*/x.bin").unwrap());
        assert_eq!(
            found,
            as_set(vec!["/user/d1/x.bin".to_string(), "/user/d2/x.bin".to_string()])
        );
    }

    #[test]
    fn test_plain_path_skips_filesystem() {
        let (_tmp, auth, dir) = fixture();
        assert_eq!(
            dir.wildcard_files(&auth, "/user/missing").unwrap(),
            vec!["/user/missing".to_string()]
        );
        assert!(dir.wildcard_files(&auth, "/other").unwrap().is_empty());
    }

    #[test]
    fn test_wildcards_can_be_disabled() {
        let (_tmp, auth, _) = fixture();
        let mut dir = VirtualDirectory::new(false);
        dir.init_after_identification(&auth);
        assert!(matches!(
            dir.wildcard_files(&auth, "/user/*"),
            Err(VfsError::WildcardNotSupported(_))
        ));
    }

    #[test]
    fn test_change_directory() {
        let (tmp, auth, mut dir) = fixture();
        fs::create_dir(home(&tmp).join("sub")).unwrap();
        fs::write(home(&tmp).join("plain"), b"").unwrap();

        dir.change_directory(&auth, "sub").unwrap();
        assert_eq!(dir.pwd().unwrap(), "/user/sub");
        dir.change_parent_directory(&auth).unwrap();
        assert_eq!(dir.pwd().unwrap(), "/user");
        dir.change_directory(&auth, "/user/sub/../sub/").unwrap();
        assert_eq!(dir.pwd().unwrap(), "/user/sub");
        dir.change_directory(&auth, "/user").unwrap();

        assert!(matches!(
            dir.change_directory(&auth, "missing"),
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            dir.change_directory(&auth, "plain"),
            Err(VfsError::NotFound(_))
        ));
        assert_eq!(dir.pwd().unwrap(), "/user");
    }

    #[test]
    fn test_change_directory_never_leaves_root() {
        let (_tmp, auth, mut dir) = fixture();
        for escape in ["..", "../..", "/user/../../..", "/etc"] {
            assert!(dir.change_directory(&auth, escape).is_err(), "{}", escape);
            assert_eq!(dir.pwd().unwrap(), "/user");
        }
        assert!(matches!(
            dir.change_directory(&auth, ".."),
            Err(VfsError::PathOutsideSandbox(_))
        ));
    }

    #[test]
    fn test_change_directory_not_checked() {
        let (_tmp, auth, mut dir) = fixture();
        dir.change_directory_not_checked(&auth, "later").unwrap();
        assert_eq!(dir.pwd().unwrap(), "/user/later");
    }

    #[test]
    fn test_ambiguous_change_directory() {
        let (tmp, auth, mut dir) = fixture();
        fs::create_dir(home(&tmp).join("d1")).unwrap();
        fs::create_dir(home(&tmp).join("d2")).unwrap();
        assert!(matches!(
            dir.change_directory(&auth, "d*"),
            Err(VfsError::AmbiguousOrNotFound { count: 2, .. })
        ));
        dir.change_directory(&auth, "d1*").unwrap();
        assert_eq!(dir.pwd().unwrap(), "/user/d1");
    }

    #[test]
    fn test_mkdir_and_rmdir() {
        let (tmp, auth, dir) = fixture();
        assert_eq!(dir.mkdir(&auth, "newdir").unwrap(), "/user/newdir");
        assert!(home(&tmp).join("newdir").is_dir());
        assert!(matches!(dir.mkdir(&auth, "newdir"), Err(VfsError::Io(_))));
        assert!(matches!(dir.mkdir(&auth, "a/b"), Err(VfsError::Io(_))));

        assert_eq!(dir.rmdir(&auth, "/user/newdir").unwrap(), "/user/newdir");
        assert!(!home(&tmp).join("newdir").exists());
        assert!(matches!(dir.rmdir(&auth, "newdir"), Err(VfsError::Io(_))));
    }

    #[test]
    fn test_mkdir_in_wildcard_parent() {
        let (tmp, auth, dir) = fixture();
        fs::create_dir(home(&tmp).join("only")).unwrap();
        assert_eq!(dir.mkdir(&auth, "on*/inner").unwrap(), "/user/only/inner");
        fs::create_dir(home(&tmp).join("onto")).unwrap();
        assert!(matches!(
            dir.mkdir(&auth, "on*/second"),
            Err(VfsError::AmbiguousOrNotFound { count: 2, .. })
        ));
    }

    #[test]
    fn test_mkdir_outside_root_is_rejected() {
        let (tmp, auth, dir) = fixture();
        assert!(matches!(
            dir.mkdir(&auth, "../escape"),
            Err(VfsError::PathOutsideSandbox(_))
        ));
        assert!(!tmp.path().join("escape").exists());
    }

    #[test]
    fn test_list_names() {
        let (tmp, auth, dir) = fixture();
        fs::write(home(&tmp).join("a.txt"), b"a").unwrap();
        fs::write(home(&tmp).join(".hidden"), b"h").unwrap();
        fs::create_dir(home(&tmp).join("subdir")).unwrap();

        assert_eq!(dir.list(&auth, "").unwrap(), vec!["a.txt", "subdir"]);
        assert_eq!(
            dir.list(&auth, "-a").unwrap(),
            vec![".hidden", "a.txt", "subdir"]
        );
        assert_eq!(dir.list(&auth, "-A /user/subdir").unwrap(), Vec::<String>::new());
        assert_eq!(dir.list(&auth, "a.txt").unwrap(), vec!["/user/a.txt"]);
        assert_eq!(dir.list(&auth, "*.txt").unwrap(), vec!["/user/a.txt"]);
        assert!(matches!(
            dir.list(&auth, "zzz*"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_full_formats() {
        let (tmp, auth, dir) = fixture();
        fs::write(home(&tmp).join("a.txt"), b"hello").unwrap();
        fs::create_dir(home(&tmp).join("sub")).unwrap();

        let mlsx = dir.list_full(&auth, "", false).unwrap();
        assert_eq!(mlsx.len(), 2);
        assert!(mlsx[0].starts_with(" Size=5;Modify="));
        assert!(mlsx[0].ends_with("Type=file;Perm=adfwr; a.txt"));
        assert!(mlsx[1].contains("Type=dir;Perm=cdmple;"));

        let ls = dir.list_full(&auth, "", true).unwrap();
        assert!(ls[0].starts_with("-rw"));
        assert!(ls[0].ends_with("\ta.txt"));
        assert!(ls[1].starts_with("drwx"));

        let all = dir.list_full(&auth, "-a", false).unwrap();
        assert_eq!(all.len(), 3);
        let parent = all.last().unwrap();
        assert!(parent.ends_with(" .."));
        assert!(parent.contains("Type=dir;"));
        assert!(!parent.contains("cdmp"));
    }

    #[test]
    fn test_file_full() {
        let (tmp, auth, dir) = fixture();
        fs::write(home(&tmp).join("a.txt"), b"hello").unwrap();

        let ls = dir.file_full(&auth, "a.txt", true).unwrap();
        assert!(ls.starts_with("Listing of \"/user/a.txt\"\n-rw"));
        assert!(ls.ends_with("\ta.txt\nEnd of listing"));

        let mlst = dir.file_full(&auth, "/user", false).unwrap();
        assert!(mlst.contains("Type=cdir;"));

        assert_eq!(
            dir.file_full(&auth, "nothere", true).unwrap(),
            "No file with name \"nothere\""
        );
    }

    #[test]
    fn test_modification_time() {
        let (tmp, auth, dir) = fixture();
        let file = home(&tmp).join("stamp");
        fs::write(&file, b"x").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        let expected = Local
            .timestamp_opt(1_700_000_000, 0)
            .unwrap()
            .format("%Y%m%d%H%M%S.000")
            .to_string();
        assert_eq!(dir.get_modification_time(&auth, "stamp").unwrap(), expected);
        assert!(matches!(
            dir.get_modification_time(&auth, "nope"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_free_space_and_current_dir_checks() {
        let (_tmp, auth, dir) = fixture();
        assert!(dir.get_free_space(&auth).is_ok());
        assert!(dir.exists(&auth).unwrap());
        assert!(dir.can_read(&auth).unwrap());
        assert!(dir.can_write(&auth).unwrap());
    }

    #[test]
    fn test_unique_file() {
        let (tmp, auth, dir) = fixture();
        let params = TransferParams::default();
        let first = dir.set_unique_file(&auth, ".stou", &params).unwrap();
        let second = dir.set_unique_file(&auth, "", &params).unwrap();
        assert_ne!(first.business_path(), second.business_path());
        assert!(first.business_path().starts_with("/user/user"));
        assert!(first.business_path().ends_with(".stou"));
        assert!(second.business_path().ends_with(".stou"));
        let name = first.business_path().trim_start_matches("/user/");
        assert!(home(&tmp).join(name).is_file());
    }

    #[test]
    fn test_digests_of_single_file() {
        let (tmp, auth, dir) = fixture();
        fs::write(home(&tmp).join("abc.dat"), b"abc").unwrap();
        fs::write(home(&tmp).join("abd.dat"), b"abd").unwrap();

        assert_eq!(
            to_hex(&dir.get_md5(&auth, "abc.dat").unwrap()),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            to_hex(&dir.get_sha256(&auth, "abc.dat").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            to_hex(&dir.get_sha1(&auth, "abc.dat").unwrap()),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(dir.get_sha512(&auth, "abc.dat").unwrap().len(), 64);
        assert_eq!(
            dir.get_crc(&auth, "abc.dat").unwrap(),
            crc32fast::hash(b"abc")
        );
        assert_eq!(
            dir.get_digest(&auth, "abc.dat", "sha-256").unwrap(),
            dir.get_sha256(&auth, "abc.dat").unwrap()
        );
        assert!(matches!(
            dir.get_md5(&auth, "ab?.dat"),
            Err(VfsError::AmbiguousOrNotFound { count: 2, .. })
        ));
        assert!(matches!(
            dir.get_md5(&auth, "/user"),
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            dir.get_digest(&auth, "abc.dat", "rot13"),
            Err(VfsError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_path_in_current_dir() {
        let (_tmp, auth, dir) = fixture();
        assert!(dir.is_path_in_current_dir(&auth, "file"));
        assert!(dir.is_path_in_current_dir(&auth, "/user/a/b"));
        assert!(!dir.is_path_in_current_dir(&auth, "../other"));
    }

    #[test]
    fn test_operations_require_identification() {
        let (_tmp, auth, _) = fixture();
        let dir = VirtualDirectory::new(true);
        assert!(matches!(dir.pwd(), Err(VfsError::NotAuthenticated)));
        assert!(matches!(dir.list(&auth, ""), Err(VfsError::NotAuthenticated)));

        let (_tmp, mut auth, mut dir) = fixture();
        auth.clear();
        dir.clear();
        assert!(matches!(
            dir.mkdir(&auth, "x"),
            Err(VfsError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_feat_of_directory() {
        let (_tmp, _auth, mut dir) = fixture();
        assert_eq!(dir.opts().feat(), " Size*;Modify*;Type*;Perm*;UNIX.mode;");
        dir.opts_mut().apply_opts("type;");
        assert_eq!(dir.opts().feat(), " Size;Modify;Type*;Perm;UNIX.mode;");
    }

    #[test]
    fn test_root_named_like_host_dir_expands_host_entries() {
        // A pattern whose parent exists on the host is treated as a real
        // path, so a business root spelled like a host directory lists the
        // host's entries instead of the mount point's.
        let tmp = tempfile::tempdir().unwrap();
        let host = tmp.path().join("host");
        fs::create_dir(&host).unwrap();
        fs::write(host.join("secret.txt"), b"host").unwrap();
        let root = host.to_string_lossy().into_owned();
        let mount = tmp.path().join("mount");
        let mirror = PathBuf::from(format!("{}{}", mount.to_string_lossy(), root));
        fs::create_dir_all(&mirror).unwrap();
        fs::write(mirror.join("mine.txt"), b"mount").unwrap();

        let mut auth = AuthContext::new(
            &mount.to_string_lossy(),
            Arc::new(TrustedAuthBackend::with_root(root.clone())),
        );
        auth.set_user("user").unwrap();
        let mut dir = VirtualDirectory::new(true);
        dir.init_after_identification(&auth);
        assert_eq!(dir.pwd().unwrap(), root);

        let found = dir.wildcard_files(&auth, &format!("{}/*", root)).unwrap();
        assert_eq!(found, vec![format!("{}/secret.txt", root)]);
        assert!(mirror.join("mine.txt").exists());
    }
}
