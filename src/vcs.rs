//! Local repository inspection
//!
//! The only thing the CLI needs from the working copy is the list of its
//! remote URLs, which narrows revision queries to the matching Diffusion
//! repositories. Uses gix (pure Rust), so no system git is required.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur when inspecting the local repository
#[derive(Debug, Error)]
pub enum VcsError {
    /// `path` is not inside a git working copy
    #[error("Not inside a git repository: {}", .0.display())]
    NotInRepository(PathBuf),
}

/// Returns the fetch and push URLs of every remote of the repository
/// containing `path`, without duplicates.
pub fn remote_urls(path: &Path) -> Result<Vec<String>, VcsError> {
    let repo = gix::discover(path).map_err(|err| {
        tracing::debug!(path = %path.display(), error = %err, "no git repository found");
        VcsError::NotInRepository(path.to_path_buf())
    })?;

    let mut urls: Vec<String> = Vec::new();
    for name in repo.remote_names() {
        let remote = match repo.find_remote(&*name) {
            Ok(remote) => remote,
            Err(err) => {
                tracing::debug!(remote = %name, error = %err, "skipping unusable remote");
                continue;
            }
        };

        for direction in [gix::remote::Direction::Fetch, gix::remote::Direction::Push] {
            if let Some(url) = remote.url(direction) {
                let url = url.to_bstring().to_string();
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }
    }

    tracing::debug!(count = urls.len(), "found local remotes");
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Lays out the minimum gix needs to recognize a repository
    fn create_repo(config: &str) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let git_dir = temp_dir.path().join(".git");
        fs::create_dir_all(git_dir.join("objects")).unwrap();
        fs::create_dir_all(git_dir.join("refs").join("heads")).unwrap();
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(git_dir.join("config"), config).unwrap();
        temp_dir
    }

    #[test]
    fn test_not_in_repository() {
        let temp_dir = TempDir::new().unwrap();
        let result = remote_urls(temp_dir.path());
        assert!(matches!(result, Err(VcsError::NotInRepository(_))));
    }

    #[test]
    fn test_repository_without_remotes() {
        let repo = create_repo("[core]\n\trepositoryformatversion = 0\n\tbare = false\n");
        assert!(remote_urls(repo.path()).unwrap().is_empty());
    }

    #[test]
    fn test_lists_remote_urls_once() {
        let repo = create_repo(
            "[core]\n\trepositoryformatversion = 0\n\tbare = false\n\
             [remote \"origin\"]\n\turl = ssh://git@phab.example.com/source/demo.git\n\
             \tfetch = +refs/heads/*:refs/remotes/origin/*\n\
             [remote \"mirror\"]\n\turl = https://github.com/example/demo.git\n\
             \tpushurl = ssh://git@github.com/example/demo.git\n",
        );

        let mut urls = remote_urls(repo.path()).unwrap();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://github.com/example/demo.git".to_string(),
                "ssh://git@github.com/example/demo.git".to_string(),
                "ssh://git@phab.example.com/source/demo.git".to_string(),
            ]
        );
    }

    #[test]
    fn test_discovers_from_subdirectory() {
        let repo = create_repo(
            "[core]\n\trepositoryformatversion = 0\n\tbare = false\n\
             [remote \"origin\"]\n\turl = https://phab.example.com/source/demo.git\n",
        );
        let nested = repo.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            remote_urls(&nested).unwrap(),
            vec!["https://phab.example.com/source/demo.git".to_string()]
        );
    }
}
