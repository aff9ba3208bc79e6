//! On-disk index persistence.
//!
//! Each build lands in its own generation directory holding `vectors.bin`
//! and `chunks.json`. A `CURRENT` file names the live generation and is
//! replaced atomically, so readers see either the old pair or the new pair.
//!
//! ```text
//! <root>/CURRENT
//! <root>/gen-<timestamp>-<id>/vectors.bin
//! <root>/gen-<timestamp>-<id>/chunks.json
//! ```

use crate::embeddings::EmbeddingClient;
use crate::index::{is_unit_norm, Index};
use crate::types::{ChunkMeta, IndexManifest};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use gridsage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const CURRENT_FILE: &str = "CURRENT";
const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";
const GENERATION_PREFIX: &str = "gen-";

/// File magic for `vectors.bin`.
const VECTORS_MAGIC: &[u8; 8] = b"GSVEC1\0\0";
const VECTORS_HEADER_LEN: u64 = 8 + 8 + 8;

#[derive(Serialize)]
struct ChunksFileRef<'a> {
    manifest: &'a IndexManifest,
    chunks: &'a [String],
    metas: &'a [ChunkMeta],
}

#[derive(Deserialize)]
struct ChunksFile {
    manifest: IndexManifest,
    chunks: Vec<String>,
    metas: Vec<ChunkMeta>,
}

/// Persistent home of one index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a generation has ever been published here.
    pub fn exists(&self) -> bool {
        self.root.join(CURRENT_FILE).is_file()
    }

    /// Embed every chunk and publish the result as the new live index.
    ///
    /// Nothing is written unless every chunk embeds successfully.
    pub async fn build(
        &self,
        texts: Vec<String>,
        metas: Vec<ChunkMeta>,
        embedder: &EmbeddingClient,
    ) -> AppResult<Index> {
        if texts.is_empty() {
            return Err(AppError::BuildInput(
                "No chunks to index; check the corpus directory and extensions".to_string(),
            ));
        }

        if texts.len() != metas.len() {
            return Err(AppError::IndexConsistency(format!(
                "{} chunk texts but {} metadata records",
                texts.len(),
                metas.len()
            )));
        }

        let vectors = embedder.embed(&texts).await?;

        for (i, vector) in vectors.iter().enumerate() {
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if !is_unit_norm(norm) {
                return Err(AppError::Embedding(format!(
                    "Chunk {} ({}) produced a degenerate embedding",
                    i, metas[i].path
                )));
            }
        }

        let digest = corpus_digest(&texts, &metas);
        let index = Index::from_parts(
            embedder.provider_name(),
            embedder.model_name(),
            vectors,
            texts,
            metas,
            digest,
        )?;

        self.write(&index)?;

        Ok(index)
    }

    /// Persist `index` as a new generation and make it live.
    pub fn write(&self, index: &Index) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)?;

        write_vectors(&staging.path().join(VECTORS_FILE), index)?;

        let chunks_file = File::create(staging.path().join(CHUNKS_FILE))?;
        let mut writer = BufWriter::new(chunks_file);
        serde_json::to_writer(
            &mut writer,
            &ChunksFileRef {
                manifest: index.manifest(),
                chunks: index.texts(),
                metas: index.metas(),
            },
        )?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        let generation = format!(
            "{}{}-{}",
            GENERATION_PREFIX,
            Utc::now().format("%Y%m%dT%H%M%S%3fZ"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let generation_dir = self.root.join(&generation);

        fs::rename(staging.path(), &generation_dir)?;
        // The staging path no longer exists, so dropping the guard removes nothing.
        drop(staging);

        let replaced = self.current_name();

        let mut pointer = tempfile::NamedTempFile::new_in(&self.root)?;
        pointer.write_all(generation.as_bytes())?;
        pointer.as_file().sync_all()?;
        pointer
            .persist(self.root.join(CURRENT_FILE))
            .map_err(|e| AppError::Io(e.error))?;

        tracing::info!(
            "Published index generation {} ({} chunks, {} dims)",
            generation,
            index.len(),
            index.dimensions()
        );

        // Readers that resolved the old pointer may still be opening its files.
        let mut keep = vec![generation.as_str()];
        keep.extend(replaced.as_deref());
        self.prune(&keep);

        Ok(generation_dir)
    }

    /// Load the live generation.
    ///
    /// With `expected_model`, an index built by any other embedding model is
    /// rejected.
    pub fn load(&self, expected_model: Option<&str>) -> AppResult<Index> {
        let generation_dir = self.current_generation()?;

        let chunks_file = File::open(generation_dir.join(CHUNKS_FILE))?;
        let stored: ChunksFile = serde_json::from_reader(BufReader::new(chunks_file))?;

        if let Some(expected) = expected_model {
            if stored.manifest.embedding_model != expected {
                return Err(AppError::IndexConsistency(format!(
                    "Index was built with embedding model '{}' but '{}' is configured; rebuild the index",
                    stored.manifest.embedding_model, expected
                )));
            }
        }

        let (n, d, vectors) = read_vectors(&generation_dir.join(VECTORS_FILE))?;

        if n != stored.manifest.chunk_count || d != stored.manifest.dimensions {
            return Err(AppError::IndexConsistency(format!(
                "vectors.bin is {} x {} but manifest declares {} x {}",
                n, d, stored.manifest.chunk_count, stored.manifest.dimensions
            )));
        }

        let index = Index::new(stored.manifest, vectors, stored.chunks, stored.metas)?;

        tracing::debug!(
            "Loaded index from {} ({} chunks)",
            generation_dir.display(),
            index.len()
        );

        Ok(index)
    }

    /// Manifest of the live generation, without reading vectors.
    pub fn stats(&self) -> AppResult<IndexManifest> {
        #[derive(Deserialize)]
        struct ManifestOnly {
            manifest: IndexManifest,
        }

        let generation_dir = self.current_generation()?;
        let file = File::open(generation_dir.join(CHUNKS_FILE))?;
        let stored: ManifestOnly = serde_json::from_reader(BufReader::new(file))?;
        Ok(stored.manifest)
    }

    /// Generation named by `CURRENT`, if the pointer is readable.
    fn current_name(&self) -> Option<String> {
        fs::read_to_string(self.root.join(CURRENT_FILE))
            .ok()
            .map(|name| name.trim().to_string())
    }

    fn current_generation(&self) -> AppResult<PathBuf> {
        let pointer = self.root.join(CURRENT_FILE);
        if !pointer.is_file() {
            return Err(AppError::IndexMissing(format!(
                "No index at {}; run `gridsage index build` first",
                self.root.display()
            )));
        }

        let name = fs::read_to_string(&pointer)?;
        let name = name.trim();

        if !name.starts_with(GENERATION_PREFIX) || name.contains(['/', '\\']) {
            return Err(AppError::IndexConsistency(format!(
                "CURRENT points at invalid generation '{}'",
                name
            )));
        }

        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Err(AppError::IndexConsistency(format!(
                "CURRENT points at missing generation '{}'",
                name
            )));
        }

        Ok(dir)
    }

    /// Remove every generation not named in `keep`. Failures are logged only.
    fn prune(&self, keep: &[&str]) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Skipping prune of {}: {}", self.root.display(), e);
                return;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(GENERATION_PREFIX) && !keep.contains(&&*name) {
                match fs::remove_dir_all(entry.path()) {
                    Ok(()) => tracing::debug!("Pruned old generation {}", name),
                    Err(e) => tracing::warn!("Failed to prune generation {}: {}", name, e),
                }
            }
        }
    }
}

/// SHA-256 over chunk texts and metadata, in row order.
pub fn corpus_digest(texts: &[String], metas: &[ChunkMeta]) -> String {
    let mut hasher = Sha256::new();
    for (text, meta) in texts.iter().zip(metas) {
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
        hasher.update(meta.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(meta.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(meta.tags.join(",").as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn write_vectors(path: &Path, index: &Index) -> AppResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(VECTORS_MAGIC)?;
    writer.write_u64::<LittleEndian>(index.len() as u64)?;
    writer.write_u64::<LittleEndian>(index.dimensions() as u64)?;
    for value in index.vectors() {
        writer.write_f32::<LittleEndian>(*value)?;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn read_vectors(path: &Path) -> AppResult<(usize, usize, Vec<f32>)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    if file_len < VECTORS_HEADER_LEN {
        return Err(AppError::IndexConsistency(format!(
            "{} is truncated ({} bytes)",
            path.display(),
            file_len
        )));
    }

    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != VECTORS_MAGIC {
        return Err(AppError::IndexConsistency(format!(
            "{} is not a vector file",
            path.display()
        )));
    }

    let n = reader.read_u64::<LittleEndian>()?;
    let d = reader.read_u64::<LittleEndian>()?;

    let expected_len = n
        .checked_mul(d)
        .and_then(|values| values.checked_mul(4))
        .and_then(|bytes| bytes.checked_add(VECTORS_HEADER_LEN));
    if expected_len != Some(file_len) {
        return Err(AppError::IndexConsistency(format!(
            "{} holds {} bytes, header declares {} x {}",
            path.display(),
            file_len,
            n,
            d
        )));
    }

    let (n, d) = (n as usize, d as usize);
    let mut values = vec![0f32; n * d];
    reader.read_f32_into::<LittleEndian>(&mut values)?;

    Ok((n, d, values))
}
