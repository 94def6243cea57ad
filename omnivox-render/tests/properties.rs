//! Properties of lighting, framebuffers and dispatch that span several modules.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use euclid::{Transform3D, point3, size3};
use itertools::iproduct;
use pretty_assertions::assert_eq;
use rstest::rstest;

use omnivox_render::math::{Aab, FreePoint, GridSize, Rgb};
use omnivox_render::raycast::Ray;
use omnivox_render::{
    Attenuation, BlendMode, Dispatcher, Fog, FogShape, Framebuffer, KernelDevice, Light,
    Material, MeshGeometry, MeshObject, PointLight, Renderable, Scene, SoftwareKernelDevice,
    VoxelBox, VoxelPoint, VoxelSphere,
};

fn grid() -> GridSize {
    GridSize::new(8).unwrap()
}

fn unattenuated(position: FreePoint, colour: Rgb) -> Light {
    Light::new(PointLight {
        position,
        colour,
        attenuation: Attenuation::NONE,
    })
}

fn in_unit_range(colour: Rgb) -> bool {
    [colour.red(), colour.green(), colour.blue()]
        .into_iter()
        .all(|c| (0.0..=1.0).contains(&c))
}

#[test]
fn lighting_is_clamped() {
    let mut scene = Scene::new(grid());
    scene.insert(Renderable::new(
        VoxelSphere::new(point3(4.0, 4.0, 4.0), 2.0),
        Material::lambert(Rgb::new(2.0, 1.0, 0.5)),
    ));
    scene.insert(Renderable::new(
        VoxelPoint::new(point3(0.5, 7.5, 0.5)),
        Material::glowing(Rgb::new(4.0, 4.0, 4.0)),
    ));
    scene.insert_light(unattenuated(point3(1.0, 1.0, 1.0), Rgb::new(5.0, 5.0, 5.0)));
    scene.insert_light(unattenuated(point3(7.0, 1.0, 7.0), Rgb::new(5.0, 0.0, 5.0)));
    scene.insert_light(Light::ambient(Rgb::new(3.0, 3.0, 3.0)));
    let snapshot = scene.snapshot();

    let material = Material::lambert(Rgb::new(3.0, 2.0, 1.0));
    for (x, y, z) in iproduct!(0..8, 0..8, 0..8) {
        let point = point3(f64::from(x) + 0.5, f64::from(y) + 0.5, f64::from(z) + 0.5);
        let colour = snapshot.voxel_lighting(point, &material, true, None, true);
        assert!(in_unit_range(colour.to_rgb()), "{point:?} → {colour:?}");
    }
}

#[rstest]
fn strong_point_light_emits_at_most_one(#[values(0.0, 0.01, 0.5)] constant: f32) {
    let light = Light::new(PointLight {
        position: point3(7.5, 0.5, 0.5),
        colour: Rgb::ONE,
        attenuation: Attenuation::new(0.0, 0.0, constant),
    });
    for distance in [0.0, 0.5, 7.0] {
        assert!(in_unit_range(light.emission(distance)), "{distance}");
    }

    // Half of the light is scattered by the fog on the way to the receiver.
    let mut scene = Scene::new(grid());
    scene.insert_fog(
        Fog::new(FogShape::Box(Aab::new(2.0, 4.0, 0.0, 8.0, 0.0, 8.0))).with_scattering(0.25),
    );
    scene.insert_light(light);
    let colour = scene.snapshot().voxel_lighting(
        point3(0.5, 0.5, 0.5),
        &Material::lambert(Rgb::ONE),
        true,
        None,
        false,
    );
    assert_eq!(colour.to_rgb(), Rgb::new(0.5, 0.5, 0.5));
}

#[test]
fn mesh_caster_blocks_light() {
    let receiver_material = Material::lambert(Rgb::ONE);
    let receiver = point3(0.5, 4.2, 4.7);
    let light = point3(7.5, 4.2, 4.7);

    let mut scene = Scene::new(grid());
    let caster = scene.insert(Renderable::new(
        MeshObject::new(MeshGeometry::cuboid(size3(1.0, 3.0, 3.0)))
            .with_transform(Transform3D::translation(4.0, 4.5, 4.5)),
        Material::lambert(Rgb::ONE),
    ));
    scene.insert_light(unattenuated(light, Rgb::ONE));

    let shadowed = scene.snapshot();
    let ray = Ray::new(receiver, [1.0, 0.0, 0.0]);
    assert!(shadowed.light_multiplier(ray, 7.0, None, true) <= 0.0);
    assert_eq!(
        shadowed
            .voxel_lighting(receiver, &receiver_material, true, None, false)
            .to_rgb(),
        Rgb::ZERO
    );

    scene.remove(caster);
    let unshadowed = scene.snapshot();
    assert_eq!(unshadowed.light_multiplier(ray, 7.0, None, true), 1.0);
    assert_eq!(
        unshadowed
            .voxel_lighting(receiver, &receiver_material, true, None, false)
            .to_rgb(),
        Rgb::ONE
    );
}

#[rstest]
fn fog_reduction_is_proportional(#[values(0.125, 0.25)] scattering: f32) {
    let fog_scene = |scattering: f32| {
        let mut scene = Scene::new(grid());
        scene.insert_fog(
            Fog::new(FogShape::Box(Aab::new(2.0, 4.0, 0.0, 8.0, 0.0, 8.0)))
                .with_scattering(scattering),
        );
        scene.snapshot()
    };
    let ray = Ray::new([0.5, 0.5, 0.5], [1.0, 0.0, 0.0]);
    let reduction = 1.0 - fog_scene(scattering).light_multiplier(ray, 7.0, None, true);
    let doubled = 1.0 - fog_scene(scattering * 2.0).light_multiplier(ray, 7.0, None, true);
    assert_eq!(reduction, scattering * 2.0);
    assert_eq!(doubled, reduction * 2.0);
}

#[test]
fn fog_and_caster_reductions_sum_and_negative_means_dark() {
    let material = Material::lambert(Rgb::ONE);
    let receiver = point3(0.5, 0.5, 0.5);
    let mut translucent = Material::lambert(Rgb::ONE);
    translucent.set_alpha(0.5);

    let mut scene = Scene::new(grid());
    scene.insert(Renderable::new(
        VoxelBox::new(Aab::new(5.0, 6.0, 0.0, 1.0, 0.0, 1.0)),
        translucent,
    ));
    scene.insert_fog(
        Fog::new(FogShape::Box(Aab::new(2.0, 4.0, 0.0, 8.0, 0.0, 8.0))).with_scattering(1.0),
    );
    scene.insert_light(unattenuated(point3(7.5, 0.5, 0.5), Rgb::ONE));
    let snapshot = scene.snapshot();
    let ray = Ray::new(receiver, [1.0, 0.0, 0.0]);
    assert_eq!(snapshot.light_multiplier(ray, 7.0, None, true), -1.5);

    let mut opaque = Scene::new(grid());
    opaque.insert(Renderable::new(
        VoxelBox::new(Aab::new(5.0, 6.0, 0.0, 1.0, 0.0, 1.0)),
        Material::lambert(Rgb::ONE),
    ));
    opaque.insert_light(unattenuated(point3(7.5, 0.5, 0.5), Rgb::ONE));
    let opaque = opaque.snapshot();
    assert_eq!(opaque.light_multiplier(ray, 7.0, None, true), 0.0);

    assert_eq!(
        snapshot.voxel_lighting(receiver, &material, true, None, false),
        opaque.voxel_lighting(receiver, &material, true, None, false),
    );
}

#[test]
fn stacked_fogs_sum_their_reductions() {
    let receiver = point3(0.5, 0.5, 0.5);
    let ray = Ray::new(receiver, [1.0, 0.0, 0.0]);
    let mut scene = Scene::new(grid());
    scene.insert_fog(
        Fog::new(FogShape::Box(Aab::new(2.0, 4.0, 0.0, 8.0, 0.0, 8.0))).with_scattering(0.25),
    );
    scene.insert_light(unattenuated(point3(7.5, 0.5, 0.5), Rgb::ONE));
    assert_eq!(scene.snapshot().light_multiplier(ray, 7.0, None, true), 0.5);

    scene.insert_fog(
        Fog::new(FogShape::Box(Aab::new(5.0, 7.0, 0.0, 8.0, 0.0, 8.0))).with_scattering(0.5),
    );
    let snapshot = scene.snapshot();
    assert_eq!(snapshot.light_multiplier(ray, 7.0, None, true), -0.5);
    assert_eq!(
        snapshot
            .voxel_lighting(receiver, &Material::lambert(Rgb::ONE), true, None, false)
            .to_rgb(),
        Rgb::ZERO
    );
}

#[test]
fn ambient_ignores_casters() {
    let material = Material::lambert(Rgb::new(1.0, 0.5, 0.25));
    let ambient_only = |with_casters: bool| {
        let mut scene = Scene::new(grid());
        if with_casters {
            scene.insert(Renderable::new(
                VoxelBox::new(Aab::new(0.0, 8.0, 2.0, 3.0, 0.0, 8.0)),
                Material::lambert(Rgb::ONE),
            ));
            scene.insert_fog(Fog::new(FogShape::Box(grid().world_aab())));
        }
        scene.insert_light(Light::ambient(Rgb::new(0.5, 0.5, 0.5)));
        scene.snapshot()
    };
    let with = ambient_only(true);
    let without = ambient_only(false);
    for point in [point3(0.5, 0.5, 0.5), point3(4.5, 6.5, 1.5)] {
        assert_eq!(
            with.voxel_lighting(point, &material, true, None, true),
            without.voxel_lighting(point, &material, true, None, true),
        );
    }
}

#[rstest]
fn additive_blend_clamps(#[values(false, true)] gpu_target: bool, #[values(false, true)] gpu_source: bool) {
    let device: Arc<dyn KernelDevice> = Arc::new(SoftwareKernelDevice::new());
    let framebuffer = |gpu: bool| {
        let mut fb = if gpu {
            Framebuffer::new_gpu(grid(), &device)
        } else {
            Framebuffer::new_cpu(grid())
        };
        fb.clear(Rgb::new(0.6, 0.0, 0.0));
        fb
    };
    let mut target = framebuffer(gpu_target);
    target.draw_framebuffer(&framebuffer(gpu_source), BlendMode::Additive);
    assert!(
        target
            .to_colours()
            .into_iter()
            .all(|c| c == Rgb::new(1.0, 0.0, 0.0))
    );
}

#[test]
fn composite_boundary_values() {
    let device: Arc<dyn KernelDevice> = Arc::new(SoftwareKernelDevice::new());
    let mut a = Framebuffer::new_gpu(grid(), &device);
    a.clear(Rgb::new(1.0, 0.25, 0.0));
    let mut b = Framebuffer::new_gpu(grid(), &device);
    b.clear(Rgb::new(0.0, 0.75, 0.5));
    let mut out = Framebuffer::new_gpu(grid(), &device);

    out.composite(&a, &b, 0.0);
    assert_eq!(out.to_colours(), a.to_colours());
    out.composite(&a, &b, 1.0);
    assert_eq!(out.to_colours(), b.to_colours());
    out.composite(&a, &b, 0.5);
    assert!(
        out.to_colours()
            .into_iter()
            .all(|c| c == Rgb::new(0.5, 0.5, 0.25))
    );
    assert_eq!(device.live_buffers(), 3);
}

#[rstest]
#[tokio::test]
async fn dispatch_touches_exactly_colliding_voxels(#[values(2, 3, 5, 64)] chunks: usize) {
    let mut scene = Scene::new(grid());
    scene.insert(Renderable::new(
        VoxelSphere::new(point3(3.0, 3.0, 3.0), 1.5),
        Material::lambert(Rgb::ONE),
    ));
    scene.insert(Renderable::new(
        VoxelPoint::new(point3(7.5, 0.5, 7.5)),
        Material::glowing(Rgb::new(0.0, 1.0, 0.0)),
    ));
    scene.insert_light(unattenuated(point3(6.0, 6.0, 1.0), Rgb::ONE));
    scene.insert_light(Light::ambient(Rgb::new(0.2, 0.2, 0.2)));
    let snapshot = scene.snapshot();
    let work: BTreeSet<usize> = snapshot.work_items().iter().map(|item| item.index()).collect();

    let mut reference = Framebuffer::new_cpu(grid());
    Dispatcher::new(NonZeroUsize::new(1))
        .dispatch(Arc::clone(&snapshot), &mut reference)
        .await;
    let mut target = Framebuffer::new_cpu(grid());
    let info = Dispatcher::new(NonZeroUsize::new(chunks))
        .dispatch(Arc::clone(&snapshot), &mut target)
        .await;

    assert_eq!(info.voxels, work.len());
    assert_eq!(target.to_colours(), reference.to_colours());
    let touched: BTreeSet<usize> = target
        .to_colours()
        .into_iter()
        .enumerate()
        .filter(|&(_, colour)| colour != Rgb::ZERO)
        .map(|(index, _)| index)
        .collect();
    assert!(!touched.is_empty());
    assert!(touched.is_subset(&work), "{:?}", touched.difference(&work));
}

#[test]
fn lights_survive_json_round_trip() {
    let distance = 2.0;
    for light in [
        Light::new(PointLight {
            position: point3(1.0, 2.0, 3.0),
            colour: Rgb::new(0.9, 0.3, 0.123),
            attenuation: Attenuation::new(0.1, 0.2, 1.0),
        }),
        Light::ambient(Rgb::new(0.1, 0.2, 0.7)),
    ] {
        let json = serde_json::to_string(&light).unwrap();
        let back = Light::from_json(&json).unwrap();
        let (before, after) = (light.emission(distance), back.emission(distance));
        for (b, a) in [
            (before.red(), after.red()),
            (before.green(), after.green()),
            (before.blue(), after.blue()),
        ] {
            assert!((b - a).abs() <= 1.0 / 255.0, "{before:?} vs {after:?}");
        }
    }
}

#[test]
fn fog_survives_json_round_trip_exactly() {
    let fog = Fog::new(FogShape::Box(Aab::new(0.5, 7.25, 1.0, 6.0, 0.0, 8.0))).with_scattering(0.3);
    let back = Fog::from_json(&serde_json::to_string(&fog).unwrap()).unwrap();
    assert_eq!(back.shape(), fog.shape());
    assert_eq!(back.scattering(), fog.scattering());
}
