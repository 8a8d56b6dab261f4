use crate::config::SessionConfig;
use crate::core_auth::{AuthBackend, AuthContext, AuthOutcome};
use crate::core_block::{DataBlock, RestartMarker};
use crate::core_dir::VirtualDirectory;
use crate::core_error::{Result, VfsError};
use crate::core_file::VirtualFile;
use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State of one client: identity, current directory, pending restart and
/// the file being transferred.
#[derive(Debug)]
pub struct Session {
    config: Arc<SessionConfig>,
    auth: AuthContext,
    dir: VirtualDirectory,
    restart: RestartMarker,
    file: Option<VirtualFile>,
}

pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    pub fn new(config: Arc<SessionConfig>, backend: Arc<dyn AuthBackend>) -> Self {
        let auth = AuthContext::new(&config.base_directory, backend);
        let dir = VirtualDirectory::new(config.wildcard_support);
        Self {
            config,
            auth,
            dir,
            restart: RestartMarker::new(),
            file: None,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn dir(&self) -> &VirtualDirectory {
        &self.dir
    }

    pub fn dir_mut(&mut self) -> &mut VirtualDirectory {
        &mut self.dir
    }

    pub fn restart(&self) -> &RestartMarker {
        &self.restart
    }

    pub fn file(&self) -> Option<&VirtualFile> {
        self.file.as_ref()
    }

    pub fn user(&mut self, user: &str) -> Result<AuthOutcome> {
        self.reinit();
        let outcome = self.auth.set_user(user)?;
        self.after_login(outcome);
        Ok(outcome)
    }

    pub fn pass(&mut self, password: &str) -> Result<AuthOutcome> {
        let outcome = self.auth.set_password(password)?;
        self.after_login(outcome);
        Ok(outcome)
    }

    fn after_login(&mut self, outcome: AuthOutcome) {
        if outcome == AuthOutcome::LoggedIn {
            self.dir.init_after_identification(&self.auth);
            info!("Session ready for {:?}", self.auth.user());
        }
    }

    /// Forgets the login and aborts any transfer in progress.
    pub fn reinit(&mut self) {
        self.abort();
        self.restart.clear();
        self.dir.clear();
        self.auth.clear();
    }

    pub fn pwd(&self) -> Result<&str> {
        self.dir.pwd()
    }

    pub fn cwd(&mut self, path: &str) -> Result<()> {
        self.dir.change_directory(&self.auth, path)
    }

    pub fn cdup(&mut self) -> Result<()> {
        self.dir.change_parent_directory(&self.auth)
    }

    pub fn mkd(&self, path: &str) -> Result<String> {
        self.dir.mkdir(&self.auth, path)
    }

    pub fn rmd(&self, path: &str) -> Result<String> {
        self.dir.rmdir(&self.auth, path)
    }

    pub fn nlst(&self, path: &str) -> Result<Vec<String>> {
        self.dir.list(&self.auth, path)
    }

    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        self.dir.list_full(&self.auth, path, true)
    }

    pub fn mlsd(&self, path: &str) -> Result<Vec<String>> {
        self.dir.list_full(&self.auth, path, false)
    }

    pub fn mlst(&self, path: &str) -> Result<String> {
        self.dir.file_full(&self.auth, path, false)
    }

    pub fn mdtm(&self, path: &str) -> Result<String> {
        self.dir.get_modification_time(&self.auth, path)
    }

    pub fn free_space(&self) -> Result<u64> {
        self.dir.get_free_space(&self.auth)
    }

    pub fn digest(&self, path: &str, algo_name: &str) -> Result<Vec<u8>> {
        self.dir.get_digest(&self.auth, path, algo_name)
    }

    /// Arms the restart marker from a REST argument.
    pub fn rest(&mut self, arg: &str) -> Result<()> {
        self.restart.arm_from_arg(arg)
    }

    /// Opens `path` for download, resuming at the armed marker if any.
    pub fn retr(&mut self, path: &str) -> Result<()> {
        let params = self.config.transfer_params();
        let mut file = self.dir.set_file(&self.auth, path, false, &params)?;
        file.retrieve(&mut self.restart)?;
        self.replace_file(file);
        Ok(())
    }

    /// Opens `path` for upload. `append` starts at the current end of file.
    pub fn stor(&mut self, path: &str, append: bool) -> Result<()> {
        let params = self.config.transfer_params();
        let mut file = self.dir.set_file(&self.auth, path, append, &params)?;
        file.store(&mut self.restart)?;
        self.replace_file(file);
        Ok(())
    }

    /// Opens a fresh uniquely named upload. Returns its business path.
    pub fn stou(&mut self) -> Result<String> {
        let params = self.config.transfer_params();
        let file = self
            .dir
            .set_unique_file(&self.auth, &self.config.unique_extension, &params)?;
        let path = file.business_path().to_string();
        self.replace_file(file);
        Ok(path)
    }

    fn replace_file(&mut self, file: VirtualFile) {
        if let Some(mut previous) = self.file.take() {
            if previous.is_ready() {
                debug!("Closing previous transfer of {}", previous.business_path());
                previous.close_file();
            }
        }
        self.file = Some(file);
    }

    fn current_file(&mut self) -> Result<&mut VirtualFile> {
        self.file
            .as_mut()
            .ok_or_else(|| VfsError::FileNotReady("no transfer in progress".to_string()))
    }

    pub fn read_block(&mut self) -> Result<DataBlock> {
        self.current_file()?.read_data_block()
    }

    pub fn write_block(&mut self, block: &DataBlock) -> Result<()> {
        self.current_file()?.write_data_block(block)
    }

    pub fn abort(&mut self) {
        if let Some(mut file) = self.file.take() {
            if file.is_ready() {
                warn!("Transfer of {} aborted", file.business_path());
                file.abort_file();
            }
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<bool> {
        let params = self.config.transfer_params();
        let mut file = self.dir.set_file(&self.auth, from, false, &params)?;
        file.rename_to(&self.dir, &self.auth, to)
    }

    pub fn dele(&mut self, path: &str) -> Result<bool> {
        let params = self.config.transfer_params();
        let mut file = self.dir.set_file(&self.auth, path, false, &params)?;
        if !file.is_file() {
            return Err(VfsError::NotFound(format!("Not a file: {}", path)));
        }
        file.delete()
    }
}

/// Runs blocking filesystem work for `session` off the async runtime.
pub async fn run_blocking<F, T>(session: SharedSession, f: F) -> Result<T>
where
    F: FnOnce(&mut Session) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = session.blocking_lock();
        f(&mut guard)
    })
    .await
    .map_err(|e| VfsError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?
}
