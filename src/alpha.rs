//! Pixel-accurate hit filtering for sprites.
//!
//! A ray that lands on a sprite's quad only counts as a hit when the texel
//! under it is opaque enough. Pixel buffers are cached per texture for the
//! tester's lifetime; textures whose pixels can't be read are treated as
//! opaque.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;

use crate::graph::SceneGraph;
use crate::picking::Intersection;
use crate::texture::{Texture, TextureId};

/// Alpha at or below which a texel is see-through.
pub const DEFAULT_ALPHA_THRESHOLD: f32 = 0.1;

/// Cached CPU copy of a texture's pixels.
#[derive(Clone, Debug)]
pub enum PixelBuffer {
    Readable(Arc<RgbaImage>),
    /// Reading failed once; the texture is treated as opaque from then on.
    Unreadable,
}

/// Filters intersections by the alpha of the texel under each hit.
#[derive(Debug)]
pub struct AlphaTester {
    threshold: f32,
    cache: HashMap<TextureId, PixelBuffer>,
}

impl Default for AlphaTester {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA_THRESHOLD)
    }
}

impl AlphaTester {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            cache: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Number of textures with a cached buffer.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Keep only the hits that land on opaque texels, preserving order.
    pub fn filter(&mut self, graph: &SceneGraph, hits: Vec<Intersection>) -> Vec<Intersection> {
        hits.into_iter()
            .filter(|hit| self.accepts(graph, hit))
            .collect()
    }

    /// Whether a single hit survives the alpha test.
    ///
    /// Solids always pass. Hits without a UV or on nodes without a texture
    /// pass too.
    pub fn accepts(&mut self, graph: &SceneGraph, hit: &Intersection) -> bool {
        if graph.is_solid(hit.entity) {
            return true;
        }
        let Some(uv) = hit.uv else {
            return true;
        };
        let Some(texture) = graph.sprite_texture(hit.entity) else {
            return true;
        };
        self.sample_alpha(&texture, uv)
            .map(|alpha| alpha > self.threshold)
            .unwrap_or(true)
    }

    /// Alpha (0 to 1) at `uv`, or `None` if the pixels aren't readable.
    pub fn sample_alpha(&mut self, texture: &Texture, uv: Vec2) -> Option<f32> {
        let buffer = self
            .cache
            .entry(texture.id())
            .or_insert_with(|| match texture.read_pixels() {
                Ok(image) => PixelBuffer::Readable(image),
                Err(err) => {
                    log::warn!("alpha test disabled for texture: {}", err);
                    PixelBuffer::Unreadable
                }
            });

        let PixelBuffer::Readable(image) = buffer else {
            return None;
        };
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);
        let v = texture.image_v(v);
        let x = ((u * width as f32) as u32).min(width - 1);
        let y = ((v * height as f32) as u32).min(height - 1);

        Some(image.get_pixel(x, y).0[3] as f32 / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use glam::Vec3;
    use image::{ImageBuffer, Rgba};

    /// Left half transparent, right half opaque. Top row (row 0) is fully opaque.
    fn half_transparent() -> Texture {
        let image = ImageBuffer::from_fn(4, 4, |x, y| {
            if y == 0 || x >= 2 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        Texture::from_image("half", image)
    }

    fn hit(entity: hecs::Entity, uv: Option<Vec2>) -> Intersection {
        Intersection {
            entity,
            distance: 1.0,
            point: Vec3::ZERO,
            uv,
        }
    }

    #[test]
    fn transparent_texels_are_rejected() {
        let mut graph = SceneGraph::new();
        let sprite = graph
            .node("sprite")
            .sprite(Arc::new(half_transparent()), Vec2::ONE)
            .spawn();
        let mut tester = AlphaTester::default();

        assert!(!tester.accepts(&graph, &hit(sprite, Some(Vec2::new(0.1, 0.5)))));
        assert!(tester.accepts(&graph, &hit(sprite, Some(Vec2::new(0.9, 0.5)))));
        assert_eq!(tester.cached(), 1);
    }

    #[test]
    fn flipped_textures_sample_from_the_top() {
        let mut tester = AlphaTester::default();
        let mut texture = half_transparent();

        // v near 1 is the top of the texture, which is row 0 when flipped.
        assert_eq!(tester.sample_alpha(&texture, Vec2::new(0.1, 0.99)), Some(1.0));

        texture.flip_y = false;
        let mut tester = AlphaTester::default();
        assert_eq!(tester.sample_alpha(&texture, Vec2::new(0.1, 0.99)), Some(0.0));
        assert_eq!(tester.sample_alpha(&texture, Vec2::new(0.1, 0.0)), Some(1.0));
    }

    #[test]
    fn protected_textures_fail_open() {
        let mut graph = SceneGraph::new();
        let texture = Texture::solid("locked", 2, 2, [0, 0, 0, 0]).protected();
        let sprite = graph.node("locked").sprite(Arc::new(texture), Vec2::ONE).spawn();
        let mut tester = AlphaTester::default();

        assert!(tester.accepts(&graph, &hit(sprite, Some(Vec2::splat(0.5)))));
        assert!(matches!(
            tester.cache.values().next(),
            Some(PixelBuffer::Unreadable)
        ));
    }

    #[test]
    fn solids_and_uvless_hits_pass() {
        let mut graph = SceneGraph::new();
        let solid = graph.node("box").solid_box(Vec3::ONE, Color::WHITE).spawn();
        let sprite = graph
            .node("sprite")
            .sprite(Arc::new(Texture::solid("clear", 1, 1, [0, 0, 0, 0])), Vec2::ONE)
            .spawn();
        let mut tester = AlphaTester::default();

        assert!(tester.accepts(&graph, &hit(solid, None)));
        assert!(tester.accepts(&graph, &hit(sprite, None)));
        assert!(!tester.accepts(&graph, &hit(sprite, Some(Vec2::splat(0.5)))));
    }

    #[test]
    fn filter_keeps_order() {
        let mut graph = SceneGraph::new();
        let a = graph.node("a").solid_box(Vec3::ONE, Color::WHITE).spawn();
        let clear = graph
            .node("clear")
            .sprite(Arc::new(Texture::solid("clear", 1, 1, [0, 0, 0, 0])), Vec2::ONE)
            .spawn();
        let b = graph.node("b").solid_box(Vec3::ONE, Color::WHITE).spawn();

        let mut tester = AlphaTester::default();
        let kept = tester.filter(
            &graph,
            vec![hit(a, None), hit(clear, Some(Vec2::splat(0.5))), hit(b, None)],
        );
        let kept: Vec<_> = kept.iter().map(|h| h.entity).collect();
        assert_eq!(kept, vec![a, b]);
    }
}
