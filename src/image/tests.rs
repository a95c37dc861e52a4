use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let mut image = Image::new(W as u32, H as u32);
    for (y, row) in data.iter().enumerate() {
        for (x, color) in row.iter().enumerate() {
            image.set(x as u32, y as u32, *color);
        }
    }
    image
}

#[test]
fn sample_inside() {
    let image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);

    let sampled = image.sample_rect(Rect::from_top_left(1.0, 0.0, 1.0, 1.0), Resolution::new(1, 1));
    assert_eq!(sampled.get(0, 0), C::GREEN);

    let upscaled = image.sample_rect(image.rect(), Resolution::new(4, 4));
    assert_eq!(upscaled.get(0, 0), C::RED);
    assert_eq!(upscaled.get(1, 1), C::RED);
    assert_eq!(upscaled.get(3, 0), C::GREEN);
    assert_eq!(upscaled.get(0, 3), C::BLUE);
    assert_eq!(upscaled.get(3, 3), C::WHITE);
}

#[test]
fn sample_outside_is_black() {
    let image = mkimage([[C::RED, C::GREEN]]);

    let sampled = image.sample_rect(Rect::from_top_left(-1.0, 0.0, 4.0, 1.0), Resolution::new(4, 1));
    assert_eq!(sampled.get(0, 0), C::BLACK);
    assert_eq!(sampled.get(1, 0), C::RED);
    assert_eq!(sampled.get(2, 0), C::GREEN);
    assert_eq!(sampled.get(3, 0), C::BLACK);

    let far = image.sample_rect(Rect::from_top_left(50.0, 50.0, 2.0, 2.0), Resolution::new(2, 2));
    assert!((0..2).all(|y| (0..2).all(|x| far.get(x, y) == C::BLACK)));
}

#[test]
fn flip_and_clear() {
    let mut image = mkimage([[C::RED, C::GREEN, C::BLUE]]);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), C::BLUE);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(2, 0), C::RED);

    image.clear(C::WHITE);
    assert!((0..3).all(|x| image.get(x, 0) == C::WHITE));
}

#[test]
fn rgb_u32() {
    let image = mkimage([[C::from_rgb8(0x12, 0x34, 0x56), C::MAGENTA]]);
    assert_eq!(image.to_rgb_u32(), vec![0x123456, 0xff00ff]);
}

#[test]
fn draw_clips_to_image() {
    let mut image = Image::new(8, 8);
    draw_line(&mut image, -10, 2, 20, 2).color(C::YELLOW);
    assert!((0..8).all(|x| image.get(x, 2) == C::YELLOW));
    assert_eq!(image.get(0, 3), C::NONE);

    draw_marker(&mut image, 0, 0).color(C::CYAN);
    assert_eq!(image.get(0, 0), C::CYAN);
    assert_eq!(image.get(1, 1), C::CYAN);

    draw_circle(&mut image, 5, 5, 1).color(C::RED).filled();
    assert_eq!(image.get(5, 5), C::RED);
}

#[test]
fn load_rejects_unknown_extension() {
    assert!(Image::load("frame.bmp").is_err());
}
