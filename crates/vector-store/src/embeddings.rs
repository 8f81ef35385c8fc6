use crate::error::{Result, VectorStoreError};
use crate::paths;
use crate::similarity::normalize;
use async_trait::async_trait;
use ndarray::{Array, Axis, Dimension, Ix2, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use ort::Error as OrtError;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;

pub const EMBEDDING_MODE_ENV: &str = "POSTSEARCH_EMBEDDING_MODE";
pub const EMBEDDING_MODEL_ENV: &str = "POSTSEARCH_EMBEDDING_MODEL";
pub const DEFAULT_MODEL: &str = "bge-small-en-v1.5";

/// Text-to-vector capability consumed by the semantic matcher and the indexer
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Whether embeddings can be produced in this environment at all.
    ///
    /// Must not trigger a model load.
    fn is_supported(&self) -> bool {
        true
    }

    /// Load whatever the embedder needs; a failure here is a [`VectorStoreError::ModelLoad`]
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }
}

/// Synchronous inference engine behind an [`EmbeddingModel`]
pub trait EmbeddingBackend: Send + Sync {
    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Builds a backend; runs on a blocking thread, at most once per successful load
pub type BackendLoader = Arc<dyn Fn() -> Result<Arc<dyn EmbeddingBackend>> + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum EmbeddingMode {
    /// ONNX Runtime inference
    #[default]
    Fast,
    /// Deterministic hash-seeded vectors, no model files needed
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        env::var(EMBEDDING_MODE_ENV).map_or(Ok(Self::Fast), |raw| raw.parse())
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Stub => "stub",
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = VectorStoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::InvalidConfig(format!(
                "Unsupported {EMBEDDING_MODE_ENV} '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }
}

/// Static description of a supported model
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    pub dimension: usize,
    pub max_length: usize,
    pub max_batch: usize,
}

impl ModelSpec {
    pub fn lookup(name: &str) -> Result<Self> {
        let (id, dimension) = match name.trim().to_ascii_lowercase().as_str() {
            "bge-small" | "bge-small-en-v1.5" => ("bge-small-en-v1.5", 384),
            "bge-base" | "bge-base-en-v1.5" => ("bge-base-en-v1.5", 768),
            "minilm" | "all-minilm-l6-v2" => ("all-minilm-l6-v2", 384),
            other => {
                return Err(VectorStoreError::InvalidConfig(format!(
                    "Unknown embedding model '{other}' (expected bge-small-en-v1.5, bge-base-en-v1.5 or all-minilm-l6-v2)"
                )))
            }
        };
        Ok(Self {
            id: id.to_string(),
            dimension,
            max_length: 512,
            max_batch: 32,
        })
    }

    /// Asset locations under `model_dir/<id>/`; `onnx/model.onnx` is accepted as an
    /// alternative to `model.onnx`
    #[must_use]
    pub fn assets_in(&self, model_dir: &Path) -> ModelAssets {
        let dir = model_dir.join(&self.id);
        let flat = dir.join("model.onnx");
        let nested = dir.join("onnx").join("model.onnx");
        ModelAssets {
            model_path: if !flat.exists() && nested.exists() {
                nested
            } else {
                flat
            },
            tokenizer_path: dir.join("tokenizer.json"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelAssets {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

impl ModelAssets {
    #[must_use]
    pub fn exist(&self) -> bool {
        self.model_path.is_file() && self.tokenizer_path.is_file()
    }
}

/// Backend selection for [`EmbeddingModel::new`]
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: ModelSpec,
    pub model_dir: PathBuf,
}

impl EmbeddingConfig {
    /// Read `POSTSEARCH_EMBEDDING_MODE`, `POSTSEARCH_EMBEDDING_MODEL` and `POSTSEARCH_MODEL_DIR`
    pub fn from_env() -> Result<Self> {
        let model = env::var(EMBEDDING_MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            mode: EmbeddingMode::from_env()?,
            model: ModelSpec::lookup(&model)?,
            model_dir: paths::model_dir(),
        })
    }

    #[must_use]
    pub const fn mode(mut self, mode: EmbeddingMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = model_dir.into();
        self
    }
}

/// Shared embedding service with a lazily loaded backend.
///
/// The backend is loaded on first use behind an async once-cell: concurrent
/// first callers wait on the same load, later callers reuse it, and a failed
/// load leaves the cell empty so the next call retries.
pub struct EmbeddingModel {
    label: String,
    dimension: usize,
    probe: Option<ModelAssets>,
    loader: BackendLoader,
    backend: OnceCell<Arc<dyn EmbeddingBackend>>,
    loads: AtomicUsize,
}

impl std::fmt::Debug for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingModel")
            .field("label", &self.label)
            .field("dimension", &self.dimension)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl EmbeddingModel {
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&EmbeddingConfig::from_env()?))
    }

    #[must_use]
    pub fn new(config: &EmbeddingConfig) -> Self {
        match config.mode {
            EmbeddingMode::Stub => Self::stub(config.model.dimension),
            EmbeddingMode::Fast => {
                let spec = config.model.clone();
                let assets = spec.assets_in(&config.model_dir);
                let load_assets = assets.clone();
                let loader: BackendLoader = Arc::new(move || {
                    let backend: Arc<dyn EmbeddingBackend> =
                        Arc::new(OrtBackend::new(&spec, &load_assets)?);
                    Ok(backend)
                });
                let mut model = Self::with_loader(config.model.id.clone(), config.model.dimension, loader);
                model.probe = Some(assets);
                model
            }
        }
    }

    #[must_use]
    pub fn stub(dimension: usize) -> Self {
        let loader: BackendLoader = Arc::new(move || {
            let backend: Arc<dyn EmbeddingBackend> = Arc::new(StubBackend::new(dimension));
            Ok(backend)
        });
        Self::with_loader("stub", dimension, loader)
    }

    /// Model around a custom backend loader
    #[must_use]
    pub fn with_loader(label: impl Into<String>, dimension: usize, loader: BackendLoader) -> Self {
        Self {
            label: label.into(),
            dimension,
            probe: None,
            loader,
            backend: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.backend.initialized()
    }

    /// Number of load attempts so far (successful or not)
    #[must_use]
    pub fn load_attempts(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn backend(&self) -> Result<Arc<dyn EmbeddingBackend>> {
        self.backend
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                let loader = Arc::clone(&self.loader);
                log::info!("Loading embedding model '{}'", self.label);
                let loaded = match spawn_blocking(move || loader()).await {
                    Ok(loaded) => loaded,
                    Err(e) => Err(VectorStoreError::ModelLoad(format!("Loader task failed: {e}"))),
                };
                loaded.map_err(|err| {
                    log::warn!("Embedding model '{}' failed to load: {err}", self.label);
                    match err {
                        VectorStoreError::ModelLoad(_) => err,
                        other => VectorStoreError::ModelLoad(other.to_string()),
                    }
                })
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_supported(&self) -> bool {
        self.probe.as_ref().map_or(true, ModelAssets::exist)
    }

    async fn ensure_ready(&self) -> Result<()> {
        self.backend().await.map(|_| ())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let backend = self.backend().await?;
        let owned = texts.to_vec();
        let embeddings = spawn_blocking(move || backend.embed_batch_blocking(&owned))
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("Join error: {e}")))??;

        if embeddings.len() != texts.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Backend returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                left: self.dimension,
                right: bad.len(),
            });
        }
        Ok(embeddings)
    }
}

/// Deterministic backend: each text maps to a hash-seeded unit vector
#[derive(Debug)]
pub struct StubBackend {
    dimension: usize,
    batch_calls: AtomicUsize,
}

impl StubBackend {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            batch_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

impl EmbeddingBackend for StubBackend {
    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

struct OrtBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    max_batch: usize,
    dimension: usize,
}

impl OrtBackend {
    fn new(spec: &ModelSpec, assets: &ModelAssets) -> Result<Self> {
        if !tokenizers::utils::parallelism::is_parallelism_configured() {
            tokenizers::utils::parallelism::set_parallelism(false);
        }

        if !assets.exist() {
            return Err(VectorStoreError::ModelLoad(format!(
                "Model files for '{}' are missing. Expected ONNX at {} and tokenizer at {} (set {} to point elsewhere).",
                spec.id,
                assets.model_path.display(),
                assets.tokenizer_path.display(),
                paths::MODEL_DIR_ENV,
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| VectorStoreError::ModelLoad(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.max_length,
                ..TruncationParams::default()
            }))
            .map_err(|e| VectorStoreError::ModelLoad(format!("Tokenizer truncation failed: {e}")))?;

        let intra_threads = default_intra_threads();
        let session = Session::builder()
            .map_err(|e| VectorStoreError::ModelLoad(format!("Failed to create ORT session: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| VectorStoreError::ModelLoad(format!("Failed to set ORT intra threads: {e}")))?
            .with_execution_providers(vec![CPUExecutionProvider::default().build()])
            .map_err(|e| {
                VectorStoreError::ModelLoad(format!("Failed to register CPU execution provider: {e}"))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VectorStoreError::ModelLoad(format!("Failed to set optimization level: {e}")))?
            .commit_from_file(&assets.model_path)
            .map_err(|e| VectorStoreError::ModelLoad(format!("Failed to load ONNX model: {e}")))?;

        log::info!(
            "Loaded ONNX model '{}' (dim {}, max_length {}, threads {})",
            spec.id,
            spec.dimension,
            spec.max_length,
            intra_threads
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: spec.max_length,
            max_batch: spec.max_batch,
            dimension: spec.dimension,
        })
    }
}

impl EmbeddingBackend for OrtBackend {
    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let encodings = self
                .tokenizer
                .encode_batch(batch.to_vec(), true)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Tokenization failed: {e}")))?;

            if encodings.is_empty() {
                continue;
            }

            let seq_len = encodings[0].len();
            if seq_len > self.max_length {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Tokenized length {} exceeds max_length {}",
                    seq_len, self.max_length
                )));
            }
            if encodings.iter().any(|e| e.len() != seq_len) {
                return Err(VectorStoreError::EmbeddingError(
                    "Inconsistent sequence lengths after padding".to_string(),
                ));
            }
            let (ids, masks, type_ids, mask_rows) = build_flat_tensors(&encodings, seq_len);

            let ids_array = Array::from_shape_vec((batch.len(), seq_len), ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("IDs shape error: {e}")))?;
            let mask_array = Array::from_shape_vec((batch.len(), seq_len), masks)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Mask shape error: {e}")))?;
            let type_array = Array::from_shape_vec((batch.len(), seq_len), type_ids)
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Types shape error: {e}")))?;
            let ids_shape = ids_array.raw_dim().into_dyn();

            let mut available: HashMap<String, DynTensor> = HashMap::new();
            available.insert(
                "input_ids".to_string(),
                Tensor::from_array(ids_array.into_dyn())
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast(),
            );
            available.insert(
                "attention_mask".to_string(),
                Tensor::from_array(mask_array.into_dyn())
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast(),
            );
            available.insert(
                "token_type_ids".to_string(),
                Tensor::from_array(type_array.into_dyn())
                    .map_err(|e| to_embedding_error(&e))?
                    .upcast(),
            );

            let array = {
                let mut session = self.session.lock().map_err(|_| {
                    VectorStoreError::EmbeddingError("Failed to lock ONNX session".into())
                })?;

                let mut feed: HashMap<String, DynTensor> = HashMap::new();
                for input in &session.inputs {
                    let key = input.name.clone();
                    let value = match available.remove(&key) {
                        Some(value) => value,
                        None => Tensor::from_array(Array::<i64, _>::zeros(ids_shape.clone()))
                            .map_err(|e| to_embedding_error(&e))?
                            .upcast(),
                    };
                    feed.insert(key, value);
                }

                let outputs = session.run(SessionInputs::from(feed)).map_err(|e| {
                    VectorStoreError::EmbeddingError(format!("ONNX forward failed: {e}"))
                })?;

                if outputs.len() == 0 {
                    return Err(VectorStoreError::EmbeddingError(
                        "ONNX returned no outputs".to_string(),
                    ));
                }

                let array = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| {
                        VectorStoreError::EmbeddingError(format!("Failed to decode ONNX output: {e}"))
                    })?
                    .to_owned();

                drop(outputs);
                drop(session);
                array
            };
            results.extend(embeddings_from_output(array, &mask_rows, self.dimension)?);
        }

        Ok(results)
    }
}

fn default_intra_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    match cpus {
        0..=4 => 1,
        5..=12 => 2,
        _ => 4,
    }
}

fn embeddings_from_output(
    array: ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dimension: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::new();
    match array.ndim() {
        2 => {
            let embeddings = array
                .into_dimensionality::<Ix2>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(embeddings.len_of(Axis(0)));
            for row in embeddings.outer_iter() {
                out.push(finish_vector(row.to_vec(), expected_dimension)?);
            }
        }
        3 => {
            let hidden = array
                .into_dimensionality::<Ix3>()
                .map_err(|e| VectorStoreError::EmbeddingError(format!("Bad output shape: {e}")))?;
            out.reserve(hidden.len_of(Axis(0)));
            for (idx, sample) in hidden.outer_iter().enumerate() {
                let attn = mask_rows
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| vec![1; sample.len_of(Axis(0))]);
                out.push(finish_vector(mean_pool(sample.view(), &attn), expected_dimension)?);
            }
        }
        _ => {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unexpected ONNX output dims: {:?}",
                array.shape()
            )));
        }
    }
    Ok(out)
}

fn finish_vector(mut vec: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if vec.len() != expected {
        return Err(VectorStoreError::DimensionMismatch {
            left: expected,
            right: vec.len(),
        });
    }
    normalize(&mut vec);
    Ok(vec)
}

fn mean_pool(sample: ndarray::ArrayView2<'_, f32>, mask: &[i64]) -> Vec<f32> {
    if sample.is_empty() {
        return vec![];
    }

    let hidden = sample.len_of(Axis(1));
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (token_idx, token) in sample.outer_iter().enumerate() {
        if *mask.get(token_idx).unwrap_or(&0) == 0 {
            continue;
        }
        count += 1.0;
        for (dim, value) in token.iter().enumerate() {
            sum[dim] += value;
        }
    }

    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

fn build_flat_tensors(
    encodings: &[Encoding],
    seq_len: usize,
) -> (Vec<i64>, Vec<i64>, Vec<i64>, Vec<Vec<i64>>) {
    let mut ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut masks = Vec::with_capacity(encodings.len() * seq_len);
    let mut type_ids = Vec::with_capacity(encodings.len() * seq_len);
    let mut mask_rows = Vec::with_capacity(encodings.len());

    for encoding in encodings {
        let encoding_ids = encoding.get_ids();
        let encoding_masks = encoding.get_attention_mask();
        let encoding_types = encoding.get_type_ids();

        for idx in 0..seq_len {
            ids.push(i64::from(*encoding_ids.get(idx).unwrap_or(&0)));
            masks.push(i64::from(*encoding_masks.get(idx).unwrap_or(&0)));
            type_ids.push(i64::from(*encoding_types.get(idx).unwrap_or(&0)));
        }

        mask_rows.push(
            encoding_masks
                .iter()
                .take(seq_len)
                .map(|v| i64::from(*v))
                .collect(),
        );
    }

    (ids, masks, type_ids, mask_rows)
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let unit = f32::from_bits(0x3f80_0000 | (high >> 9)) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn to_embedding_error(error: &OrtError) -> VectorStoreError {
    VectorStoreError::EmbeddingError(format!("{error}"))
}
