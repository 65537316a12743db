// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end behaviour of the rectification engine through the public API.

use approx::assert_relative_eq;
use flatscan_core::{FlatscanError, Interpolation, Pixel, Point, Quadrilateral, RectifyConfig, WHITE};
use flatscan_document::{RasterImage, Rectifier, rectify, solve};

const RED: Pixel = [255, 0, 0, 255];

/// Deterministic, non-uniform test pattern.
fn pattern(width: u32, height: u32) -> RasterImage {
    let mut img = RasterImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 7 % 256) as u8;
            let g = (y * 13 % 256) as u8;
            let b = ((x + y) * 3 % 256) as u8;
            img.put_pixel(x, y, [r, g, b, 255]);
        }
    }
    img
}

fn skewed_quad() -> Quadrilateral {
    Quadrilateral::new(
        Point::new(37.5, 21.0),
        Point::new(352.0, 48.25),
        Point::new(371.0, 281.0),
        Point::new(12.0, 260.5),
    )
}

#[test]
fn canonical_rectangle_reproduces_source() {
    for (w, h) in [(1, 1), (7, 3), (64, 48), (123, 77)] {
        let src = pattern(w, h);
        let quad = Quadrilateral::canonical_rect(w, h);
        let out = rectify(&src, &quad, w, h, WHITE).unwrap();
        assert_eq!(out, src, "identity failed for {w}x{h}");
    }
}

#[test]
fn repeated_identity_is_stable() {
    let src = pattern(50, 40);
    let quad = Quadrilateral::canonical_rect(50, 40);
    let once = rectify(&src, &quad, 50, 40, WHITE).unwrap();
    let twice = rectify(&once, &quad, 50, 40, WHITE).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn solved_matrix_maps_rectangle_corners_onto_quad() {
    let quad = skewed_quad();
    let rect = Quadrilateral::canonical_rect(340, 240);
    let h = solve(&rect.points(), &quad.points()).unwrap();
    for (corner, target) in rect.points().iter().zip(quad.points()) {
        let mapped = h.apply(*corner).unwrap();
        assert_relative_eq!(mapped.x, target.x, epsilon = 1e-6, max_relative = 1e-6);
        assert_relative_eq!(mapped.y, target.y, epsilon = 1e-6, max_relative = 1e-6);
    }
    assert_eq!(h.coefficients()[8], 1.0);
}

#[test]
fn every_output_pixel_is_source_or_background() {
    let src = RasterImage::filled(400, 300, RED);
    let background = [0, 0, 255, 255];
    let quad = Quadrilateral::new(
        Point::new(-80.0, -20.0),
        Point::new(420.0, 10.0),
        Point::new(460.0, 340.0),
        Point::new(-30.0, 290.0),
    );
    let out = rectify(&src, &quad, 256, 192, background).unwrap();
    assert!(out.pixels().all(|p| p == RED || p == background));
    assert!(out.pixels().any(|p| p == RED));
    assert!(out.pixels().any(|p| p == background));
}

#[test]
fn solid_red_square_inside_frame() {
    let src = RasterImage::filled(400, 300, RED);
    let quad = Quadrilateral::new(
        Point::new(100.0, 50.0),
        Point::new(300.0, 50.0),
        Point::new(300.0, 250.0),
        Point::new(100.0, 250.0),
    );
    let out = rectify(&src, &quad, 200, 200, WHITE).unwrap();
    assert_eq!(out.dimensions(), (200, 200));
    assert!(out.pixels().all(|p| p == RED));
}

#[test]
fn corner_outside_frame_gets_background() {
    let src = RasterImage::filled(400, 300, RED);
    let quad = Quadrilateral::new(
        Point::new(-50.0, -50.0),
        Point::new(300.0, 50.0),
        Point::new(300.0, 250.0),
        Point::new(100.0, 250.0),
    );
    let out = rectify(&src, &quad, 200, 200, WHITE).unwrap();
    // Output origin maps exactly onto (-50, -50).
    assert_eq!(out.pixel(0, 0), WHITE);
    // Far corner maps well inside the frame.
    assert_eq!(out.pixel(199, 199), RED);
    assert!(out.pixels().all(|p| p == RED || p == WHITE));
}

#[test]
fn three_collinear_corners_are_rejected() {
    let src = RasterImage::filled(100, 100, RED);
    let quad = Quadrilateral::new(
        Point::new(10.0, 10.0),
        Point::new(50.0, 10.0),
        Point::new(90.0, 10.0),
        Point::new(10.0, 90.0),
    );
    let err = rectify(&src, &quad, 80, 80, WHITE).unwrap_err();
    assert!(matches!(err, FlatscanError::DegenerateGeometry(_)));
}

#[test]
fn concave_quad_is_rejected_instead_of_mirrored() {
    let src = RasterImage::filled(400, 400, RED);
    let quad = Quadrilateral::new(
        Point::new(0.0, 0.0),
        Point::new(400.0, 0.0),
        Point::new(100.0, 100.0),
        Point::new(0.0, 400.0),
    );
    let err = rectify(&src, &quad, 200, 200, WHITE).unwrap_err();
    assert!(matches!(err, FlatscanError::DegenerateGeometry(_)), "{err}");
}

#[test]
fn self_intersecting_quad_is_rejected() {
    let src = RasterImage::filled(400, 400, RED);
    // TR and BR swapped: the outline crosses itself.
    let bowtie = Quadrilateral::new(
        Point::new(50.0, 50.0),
        Point::new(350.0, 350.0),
        Point::new(350.0, 50.0),
        Point::new(50.0, 350.0),
    );
    let err = rectify(&src, &bowtie, 200, 200, WHITE).unwrap_err();
    assert!(matches!(err, FlatscanError::DegenerateGeometry(_)), "{err}");
}

#[test]
fn mirrored_winding_is_still_rectified() {
    let src = pattern(60, 40);
    let [tl, tr, br, bl] = Quadrilateral::canonical_rect(60, 40).points();
    // TL, BL, BR, TR: a transpose, convex but wound the other way.
    let quad = Quadrilateral::new(tl, bl, br, tr);
    let out = rectify(&src, &quad, 40, 60, WHITE).unwrap();
    assert_eq!(out.pixel(0, 0), src.pixel(0, 0));
    assert_eq!(out.pixel(7, 3), src.pixel(3, 7));
}

#[test]
fn huge_output_sizes_fail_cleanly() {
    let src = RasterImage::filled(4, 4, RED);
    let quad = Quadrilateral::canonical_rect(4, 4);
    let err = rectify(&src, &quad, 1 << 31, 1 << 31, WHITE).unwrap_err();
    assert!(matches!(err, FlatscanError::InvalidDimensions { .. }), "{err}");
}

#[test]
fn zero_sized_outputs_are_rejected() {
    let src = RasterImage::filled(100, 100, RED);
    let quad = Quadrilateral::canonical_rect(100, 100);
    assert!(matches!(
        rectify(&src, &quad, 0, 50, WHITE),
        Err(FlatscanError::InvalidDimensions { width: 0, height: 50 })
    ));
    assert!(matches!(
        rectify(&src, &quad, 50, 0, WHITE),
        Err(FlatscanError::InvalidDimensions { width: 50, height: 0 })
    ));
}

#[test]
fn bilinear_skewed_warp_stays_within_source_range() {
    let src = pattern(400, 300);
    let rectifier = Rectifier::new(RectifyConfig {
        interpolation: Interpolation::Bilinear,
        ..Default::default()
    });
    let out = rectifier.rectify(&src, &skewed_quad(), 300, 220, WHITE).unwrap();
    assert_eq!(out.dimensions(), (300, 220));
    assert!(out.pixels().all(|p| p[3] == 255));
}

#[test]
fn source_is_left_untouched() {
    let src = pattern(60, 45);
    let before = src.clone();
    let _ = rectify(&src, &skewed_quad(), 30, 20, WHITE).unwrap();
    assert_eq!(src, before);
}
