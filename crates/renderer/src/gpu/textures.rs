use std::collections::HashMap;

use anyhow::{bail, Result};
use editstate::{ImageState, LayerId, TextureId, TextureSource};
use wgpu::util::{DeviceExt, TextureDataOrder};

/// Where a texture is bound during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TextureSlot {
    Photo,
    Layer(LayerId),
}

/// Turns a [`TextureSource`] into something a program can sample.
pub(crate) trait TextureUploader {
    type Texture;

    fn upload(&mut self, source: &TextureSource) -> Result<Self::Texture>;

    fn release(&mut self, _texture: Self::Texture) {}
}

struct CachedTexture<T> {
    id: TextureId,
    texture: T,
}

/// One uploaded texture per slot, replaced only when the slot's source id
/// changes.
pub(crate) struct TextureCache<U: TextureUploader> {
    uploader: U,
    slots: HashMap<TextureSlot, CachedTexture<U::Texture>>,
    uploads: u64,
}

impl<U: TextureUploader> TextureCache<U> {
    pub fn new(uploader: U) -> Self {
        Self {
            uploader,
            slots: HashMap::new(),
            uploads: 0,
        }
    }

    /// Makes `slot` hold `source`, uploading only if the id differs from what
    /// is already there.
    pub fn ensure(&mut self, slot: TextureSlot, source: &TextureSource) -> Result<()> {
        if self
            .slots
            .get(&slot)
            .is_some_and(|cached| cached.id == source.id())
        {
            return Ok(());
        }
        let texture = self.uploader.upload(source)?;
        self.uploads += 1;
        tracing::debug!(?slot, id = %source.id(), "uploaded texture");
        let previous = self.slots.insert(
            slot,
            CachedTexture {
                id: source.id(),
                texture,
            },
        );
        if let Some(previous) = previous {
            self.uploader.release(previous.texture);
        }
        Ok(())
    }

    /// Brings every slot in line with `state`. A photo that fails to upload
    /// fails the frame; a layer that fails is logged and left without a
    /// texture so the rest of the frame still draws.
    pub fn sync(&mut self, state: &ImageState) -> Result<()> {
        if let Some(source) = &state.source {
            self.ensure(TextureSlot::Photo, source)?;
        }
        let mut failed = Vec::new();
        for layer in &state.layers {
            let Some(texture) = &layer.texture else {
                continue;
            };
            let slot = TextureSlot::Layer(layer.id);
            if let Err(err) = self.ensure(slot, texture) {
                tracing::warn!(layer = %layer.id, error = %err, "skipping layer texture");
                failed.push(slot);
            }
        }
        self.retain(|slot| {
            !failed.contains(&slot)
                && match slot {
                    TextureSlot::Photo => state.source.is_some(),
                    TextureSlot::Layer(id) => state
                        .layer(id)
                        .is_some_and(|layer| layer.texture.is_some()),
                }
        });
        Ok(())
    }

    pub fn get(&self, slot: TextureSlot) -> Option<&U::Texture> {
        self.slots.get(&slot).map(|cached| &cached.texture)
    }

    /// Drops every slot for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(TextureSlot) -> bool) {
        let stale: Vec<TextureSlot> = self
            .slots
            .keys()
            .copied()
            .filter(|slot| !keep(*slot))
            .collect();
        for slot in stale {
            if let Some(cached) = self.slots.remove(&slot) {
                tracing::trace!(?slot, "released texture");
                self.uploader.release(cached.texture);
            }
        }
    }

    pub fn clear(&mut self) {
        self.retain(|_| false);
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads
    }
}

pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub(crate) struct GpuUploader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_dimension: u32,
}

impl GpuUploader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, max_dimension: u32) -> Self {
        Self {
            device,
            queue,
            max_dimension,
        }
    }

    /// 1x1 transparent texture bound where a program needs a texture but the
    /// frame has none, e.g. the blur brush before a photo is set.
    pub fn placeholder(&self) -> GpuTexture {
        create_texture(&self.device, &self.queue, "placeholder texture", 1, 1, &[0, 0, 0, 0])
    }
}

impl TextureUploader for GpuUploader {
    type Texture = GpuTexture;

    fn upload(&mut self, source: &TextureSource) -> Result<GpuTexture> {
        let (width, height) = source.dimensions();
        if width > self.max_dimension || height > self.max_dimension {
            bail!(
                "texture {width}x{height} exceeds the GPU limit of {}",
                self.max_dimension
            );
        }
        let pixels = source.to_rgba();
        Ok(create_texture(
            &self.device,
            &self.queue,
            &format!("texture {}", source.id()),
            width,
            height,
            &pixels,
        ))
    }

    fn release(&mut self, texture: GpuTexture) {
        texture.texture.destroy();
    }
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editstate::TextureSourceFactory;

    #[derive(Default)]
    struct CountingUploader {
        released: usize,
        max_dimension: Option<u32>,
    }

    impl TextureUploader for CountingUploader {
        type Texture = TextureId;

        fn upload(&mut self, source: &TextureSource) -> Result<TextureId> {
            let (width, height) = source.dimensions();
            if let Some(max) = self.max_dimension {
                if width.max(height) > max {
                    bail!("texture {width}x{height} exceeds {max}");
                }
            }
            Ok(source.id())
        }

        fn release(&mut self, _texture: TextureId) {
            self.released += 1;
        }
    }

    fn source(factory: &TextureSourceFactory) -> TextureSource {
        factory
            .create_raw_source(1, 1, vec![1, 2, 3, 255], false)
            .unwrap()
    }

    #[test]
    fn same_id_is_uploaded_once() {
        let factory = TextureSourceFactory::new();
        let photo = source(&factory);
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.ensure(TextureSlot::Photo, &photo).unwrap();
        cache.ensure(TextureSlot::Photo, &photo.clone()).unwrap();
        assert_eq!(cache.upload_count(), 1);
        assert_eq!(cache.get(TextureSlot::Photo), Some(&photo.id()));
    }

    #[test]
    fn new_id_replaces_and_releases_previous() {
        let factory = TextureSourceFactory::new();
        let mut cache = TextureCache::new(CountingUploader::default());
        cache.ensure(TextureSlot::Photo, &source(&factory)).unwrap();
        let replacement = source(&factory);
        cache.ensure(TextureSlot::Photo, &replacement).unwrap();
        assert_eq!(cache.upload_count(), 2);
        assert_eq!(cache.uploader.released, 1);
        assert_eq!(cache.get(TextureSlot::Photo), Some(&replacement.id()));
    }

    #[test]
    fn retain_drops_layers_no_longer_present() {
        let factory = TextureSourceFactory::new();
        let mut cache = TextureCache::new(CountingUploader::default());
        cache
            .ensure(TextureSlot::Layer(LayerId(1)), &source(&factory))
            .unwrap();
        cache
            .ensure(TextureSlot::Layer(LayerId(2)), &source(&factory))
            .unwrap();
        cache.retain(|slot| slot != TextureSlot::Layer(LayerId(1)));
        assert!(cache.get(TextureSlot::Layer(LayerId(1))).is_none());
        assert!(cache.get(TextureSlot::Layer(LayerId(2))).is_some());
        cache.clear();
        assert_eq!(cache.uploader.released, 2);
    }

    fn layer_with(id: u64, texture: TextureSource) -> editstate::Layer {
        editstate::Layer::new(
            LayerId(id),
            id as i32,
            editstate::LayerKind::Sticker(editstate::StickerLayer {
                source: format!("sticker {id}"),
                width: 1,
                height: 1,
            }),
        )
        .with_texture(texture)
    }

    #[test]
    fn oversized_layer_is_skipped_without_failing_the_frame() {
        let factory = TextureSourceFactory::new();
        let photo = source(&factory);
        let small = source(&factory);
        let huge = factory
            .create_raw_source(8, 1, vec![0; 8 * 4], false)
            .unwrap();
        let state = ImageState::from_source(photo.clone())
            .with_layer(layer_with(1, huge))
            .with_layer(layer_with(2, small.clone()));

        let mut cache = TextureCache::new(CountingUploader {
            max_dimension: Some(4),
            ..CountingUploader::default()
        });
        cache.sync(&state).unwrap();
        assert_eq!(cache.get(TextureSlot::Photo), Some(&photo.id()));
        assert!(cache.get(TextureSlot::Layer(LayerId(1))).is_none());
        assert_eq!(cache.get(TextureSlot::Layer(LayerId(2))), Some(&small.id()));
    }

    #[test]
    fn oversized_photo_fails_the_sync() {
        let factory = TextureSourceFactory::new();
        let photo = factory
            .create_raw_source(8, 1, vec![0; 8 * 4], false)
            .unwrap();
        let mut cache = TextureCache::new(CountingUploader {
            max_dimension: Some(4),
            ..CountingUploader::default()
        });
        assert!(cache.sync(&ImageState::from_source(photo)).is_err());
    }
}
