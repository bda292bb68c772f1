use crate::batch::TemplateInput;
use crate::compile::TemplateCompilationArtifact;
use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub artifact: TemplateCompilationArtifact,
}

/// On-disk artifact cache keyed by a hash of the complete template input.
pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                warn!("cannot create template cache dir {:?}: {}", cache_dir, e);
            }
        }
        Self { cache_dir }
    }

    pub fn compute_hash(input: &TemplateInput) -> String {
        let mut hasher = Sha256::new();
        hasher.update((input.statics.len() as u64).to_le_bytes());
        for s in &input.statics {
            // Length prefix keeps ["ab", "c"] and ["a", "bc"] apart.
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        hasher.update([input.svg as u8]);
        let invariant: Vec<u8> = input.invariant_exprs.iter().map(|&b| b as u8).collect();
        hasher.update(&invariant);
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", hash))
    }

    pub fn get(&self, input: &TemplateInput) -> Option<TemplateCompilationArtifact> {
        let hash = Self::compute_hash(input);
        let cache_path = self.get_cache_path(&hash);
        if !cache_path.exists() {
            return None;
        }

        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!("template cache entry {} is corrupt: {}", hash, e);
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == hash {
            Some(entry.artifact)
        } else {
            None
        }
    }

    pub fn set(&self, input: &TemplateInput, artifact: &TemplateCompilationArtifact) {
        let hash = Self::compute_hash(input);
        let cache_path = self.get_cache_path(&hash);
        let entry = CacheEntry {
            hash,
            artifact: artifact.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&cache_path, data) {
                    warn!("cannot write template cache entry {:?}: {}", cache_path, e);
                }
            }
            Err(e) => warn!("cannot serialize template cache entry: {}", e),
        }
    }
}
