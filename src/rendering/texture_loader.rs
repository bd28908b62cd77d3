use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::render::texture::ImageLoaderSettings;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;
use image::imageops::FilterType;
use image::RgbaImage;
use thiserror::Error;

use crate::config::DemoConfig;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load matcap {0}")]
    Load(String),
    #[error("matcap {path} has unsupported format {format:?}")]
    UnsupportedFormat { path: String, format: TextureFormat },
    #[error("matcap {0} has no pixels")]
    Empty(String),
}

/// Matcaps are uploaded without sRGB decoding: the shader works on the
/// stored texel values.
pub fn matcap_loader_settings(settings: &mut ImageLoaderSettings) {
    settings.is_srgb = false;
}

/// 把已加载的 Bevy 图像复制为 RGBA8 像素，用于生成缩略图。
pub fn rgba_pixels(image: &Image, path: &str) -> Result<RgbaImage, TextureError> {
    let format = image.texture_descriptor.format;
    if !matches!(
        format,
        TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb
    ) {
        return Err(TextureError::UnsupportedFormat {
            path: path.to_string(),
            format,
        });
    }

    let size = image.texture_descriptor.size;
    if size.width == 0 || size.height == 0 {
        return Err(TextureError::Empty(path.to_string()));
    }
    RgbaImage::from_raw(size.width, size.height, image.data.clone())
        .ok_or_else(|| TextureError::Empty(path.to_string()))
}

/// 缩略图最长边不超过 `thumbnail_size`，不放大。
pub fn make_thumbnail(full: &RgbaImage, thumbnail_size: u32) -> RgbaImage {
    let (width, height) = full.dimensions();
    let scale = (thumbnail_size.max(1) as f32 / width.max(height).max(1) as f32).min(1.0);
    let thumb_w = ((width as f32 * scale).round() as u32).max(1);
    let thumb_h = ((height as f32 * scale).round() as u32).max(1);
    image::imageops::resize(full, thumb_w, thumb_h, FilterType::Triangle)
}

/// Thumbnails go straight to egui, which expects sRGB.
fn thumbnail_image(rgba: RgbaImage) -> Image {
    let (width, height) = rgba.dimensions();
    Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
    )
}

#[derive(Debug, Clone)]
pub struct LoadedMatcap {
    pub image: Handle<Image>,
    pub thumbnail: Handle<Image>,
}

#[derive(Debug, Clone, Default)]
pub enum SlotState {
    #[default]
    Pending,
    /// 已交给 AssetServer，等待加载完成
    Loading(Handle<Image>),
    /// 原图已就绪，缩略图仍在生成
    Thumbnail,
    Ready(LoadedMatcap),
    Failed,
}

impl SlotState {
    fn is_settled(&self) -> bool {
        matches!(self, SlotState::Ready(_) | SlotState::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct MatcapSlot {
    /// Path relative to the asset root.
    pub path: String,
    pub state: SlotState,
}

/// 所有 matcap 纹理，按配置顺序排列。加载失败的纹理不会出现在选择器中。
#[derive(Resource, Debug, Clone)]
pub struct MatcapLibrary {
    slots: Vec<MatcapSlot>,
    active: Option<usize>,
    default_index: usize,
}

impl MatcapLibrary {
    pub fn new(paths: impl IntoIterator<Item = String>, default_index: usize) -> Self {
        let slots = paths
            .into_iter()
            .map(|path| MatcapSlot {
                path,
                state: SlotState::Pending,
            })
            .collect();
        Self {
            slots,
            active: None,
            default_index,
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        Self::new(
            config.matcaps.textures.iter().cloned(),
            config.matcaps.default_index,
        )
    }

    pub fn slots(&self) -> &[MatcapSlot] {
        &self.slots
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_texture(&self) -> Option<&Handle<Image>> {
        self.active.and_then(|i| self.loaded(i)).map(|m| &m.image)
    }

    pub fn loaded(&self, index: usize) -> Option<&LoadedMatcap> {
        match self.slots.get(index).map(|s| &s.state) {
            Some(SlotState::Ready(loaded)) => Some(loaded),
            _ => None,
        }
    }

    /// Ready slots in picker order.
    pub fn ready(&self) -> impl Iterator<Item = (usize, &LoadedMatcap)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match &slot.state {
                SlotState::Ready(loaded) => Some((i, loaded)),
                _ => None,
            })
    }

    /// Slots waiting on the asset server, with their handles.
    pub fn loading(&self) -> impl Iterator<Item = (usize, &Handle<Image>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match &slot.state {
                SlotState::Loading(handle) => Some((i, handle)),
                _ => None,
            })
    }

    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(|slot| slot.state.is_settled())
    }

    pub fn failed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Failed))
            .count()
    }

    fn set_state(&mut self, index: usize, state: SlotState) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = state;
        }
    }

    pub fn begin_loading(&mut self, index: usize, handle: Handle<Image>) {
        self.set_state(index, SlotState::Loading(handle));
    }

    pub fn mark_thumbnail_pending(&mut self, index: usize) {
        self.set_state(index, SlotState::Thumbnail);
    }

    pub fn mark_ready(&mut self, index: usize, loaded: LoadedMatcap) {
        self.set_state(index, SlotState::Ready(loaded));
    }

    pub fn mark_failed(&mut self, index: usize) {
        self.set_state(index, SlotState::Failed);
    }

    /// 选择一张已加载的纹理，返回其句柄；未加载、失败或越界的槽位不会被选中。
    pub fn select(&mut self, index: usize) -> Option<Handle<Image>> {
        let handle = self.loaded(index)?.image.clone();
        self.active = Some(index);
        Some(handle)
    }

    /// 默认纹理加载完成后立即选中；若默认纹理失败或不存在，则在全部加载结束后选第一张可用的。
    pub fn initial_selection(&self) -> Option<usize> {
        if self.active.is_some() {
            return None;
        }
        if self.loaded(self.default_index).is_some() {
            return Some(self.default_index);
        }
        let default_pending = self
            .slots
            .get(self.default_index)
            .is_some_and(|slot| !slot.state.is_settled());
        if default_pending || !self.is_settled() {
            return None;
        }
        self.ready().next().map(|(i, _)| i)
    }
}

#[derive(Component)]
pub struct MatcapThumbnailTask {
    pub index: usize,
    pub image: Handle<Image>,
    pub task: Task<RgbaImage>,
}

pub fn start_matcap_loading(asset_server: Res<AssetServer>, mut library: ResMut<MatcapLibrary>) {
    info!("Loading {} matcap textures", library.slots().len());

    for index in 0..library.slots().len() {
        let path = library.slots()[index].path.clone();
        let handle = asset_server.load_with_settings(path, matcap_loader_settings);
        library.begin_loading(index, handle);
    }
}

/// 检查 AssetServer 的加载状态：成功的交给任务池生成缩略图，失败的标记并跳过。
pub fn poll_matcap_assets(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    images: Res<Assets<Image>>,
    config: Res<DemoConfig>,
    mut library: ResMut<MatcapLibrary>,
) {
    let finished: Vec<(usize, Handle<Image>, LoadState)> = library
        .loading()
        .filter_map(|(index, handle)| match asset_server.get_load_state(handle.id()) {
            Some(state @ (LoadState::Loaded | LoadState::Failed)) => {
                Some((index, handle.clone(), state))
            }
            _ => None,
        })
        .collect();
    if finished.is_empty() {
        return;
    }

    let thumbnail_size = config.matcaps.thumbnail_size;
    let task_pool = AsyncComputeTaskPool::get();

    for (index, handle, state) in finished {
        let path = library.slots()[index].path.clone();
        let pixels = match state {
            LoadState::Loaded => images
                .get(&handle)
                .ok_or_else(|| TextureError::Load(path.clone()))
                .and_then(|image| rgba_pixels(image, &path)),
            _ => Err(TextureError::Load(path.clone())),
        };

        match pixels {
            Ok(full) => {
                let task = task_pool.spawn(async move { make_thumbnail(&full, thumbnail_size) });
                commands.spawn(MatcapThumbnailTask {
                    index,
                    image: handle,
                    task,
                });
                library.mark_thumbnail_pending(index);
            }
            Err(e) => {
                warn!("{e}");
                library.mark_failed(index);
            }
        }
    }
}

pub fn poll_thumbnail_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut MatcapThumbnailTask)>,
    mut images: ResMut<Assets<Image>>,
    mut library: ResMut<MatcapLibrary>,
) {
    for (entity, mut job) in &mut tasks {
        let Some(thumbnail) = future::block_on(future::poll_once(&mut job.task)) else {
            continue;
        };

        let loaded = LoadedMatcap {
            image: job.image.clone(),
            thumbnail: images.add(thumbnail_image(thumbnail)),
        };
        library.mark_ready(job.index, loaded);
        debug!("Matcap {} ready", job.index);

        commands.entity(entity).despawn();
    }
}

pub fn apply_initial_selection(mut library: ResMut<MatcapLibrary>) {
    if let Some(index) = library.initial_selection() {
        if library.select(index).is_some() {
            info!("Selected matcap {index}");
        }
    }
}
