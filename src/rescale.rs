//! Mapping bounding boxes between the model's working resolution and the
//! original image resolution.

/// Rescale a bounding box from `src` pixel space to `dst` pixel space.
///
/// Each axis is scaled independently by `dst / src` and the result truncated
/// toward zero to an integer pixel index. A no-op when the sizes match.
pub fn rescale_bbox(bbox: [i32; 4], src: (u32, u32), dst: (u32, u32)) -> [i32; 4] {
    if src == dst {
        return bbox;
    }
    let scale_x = dst.0 as f32 / src.0 as f32;
    let scale_y = dst.1 as f32 / src.1 as f32;
    [
        (bbox[0] as f32 * scale_x) as i32,
        (bbox[1] as f32 * scale_y) as i32,
        (bbox[2] as f32 * scale_x) as i32,
        (bbox[3] as f32 * scale_y) as i32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotent_on_equal_sizes() {
        let bbox = [13, 27, 101, 333];
        assert_eq!(rescale_bbox(bbox, (640, 480), (640, 480)), bbox);
    }

    #[test]
    fn test_doubling_doubles_coordinates() {
        let bbox = [10, 20, 30, 40];
        assert_eq!(
            rescale_bbox(bbox, (320, 240), (640, 480)),
            [20, 40, 60, 80]
        );
    }

    #[test]
    fn test_independent_axes() {
        // x scaled by 2, y by 1/2.
        assert_eq!(
            rescale_bbox([10, 100, 20, 200], (100, 400), (200, 200)),
            [20, 50, 40, 100]
        );
    }

    #[test]
    fn test_truncates_toward_zero() {
        // 5 * (3/2) = 7.5 -> 7
        assert_eq!(rescale_bbox([5, 5, 5, 5], (2, 2), (3, 3)), [7, 7, 7, 7]);
    }
}
