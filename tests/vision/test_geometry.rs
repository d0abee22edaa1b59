use fabstir_vision_node::vision::Detection;

#[test]
fn test_center_and_area_are_exact() {
    let boxes = [
        [0.0f32, 0.0, 10.0, 10.0],
        [12.5, 7.25, 100.0, 250.5],
        [300.0, 5.0, 301.0, 6.0],
    ];
    for bbox in boxes {
        let det = Detection::from_box(bbox, 0.9, "person", 640, 480);
        assert_eq!(det.center.0, (bbox[0] + bbox[2]) / 2.0);
        assert_eq!(det.center.1, (bbox[1] + bbox[3]) / 2.0);
        assert_eq!(
            det.dimensions.area,
            (bbox[2] - bbox[0]) * (bbox[3] - bbox[1])
        );
        assert_eq!(det.dimensions.width, bbox[2] - bbox[0]);
        assert_eq!(det.dimensions.height, bbox[3] - bbox[1]);
    }
}

#[test]
fn test_relative_size_within_bounds() {
    let image_boxes = [
        [0.0f32, 0.0, 64.0, 48.0],
        [10.0, 10.0, 20.0, 20.0],
        [0.0, 0.0, 1.0, 1.0],
        [63.0, 47.0, 64.0, 48.0],
    ];
    for bbox in image_boxes {
        let det = Detection::from_box(bbox, 0.5, "car", 64, 48);
        assert!(det.relative_size >= 0.0, "bbox {:?}", bbox);
        assert!(det.relative_size <= 100.0, "bbox {:?}", bbox);
    }
}

#[test]
fn test_full_image_box_is_exactly_100() {
    let det = Detection::from_box([0.0, 0.0, 1920.0, 1080.0], 0.99, "person", 1920, 1080);
    assert_eq!(det.relative_size, 100.0);
}

#[test]
fn test_detection_is_plain_data() {
    // Cloning and comparing must observe the same derived values
    let det = Detection::from_box([5.0, 5.0, 15.0, 25.0], 0.7, "dog", 100, 100);
    let copy = det.clone();
    assert_eq!(det, copy);
    assert_eq!(copy.dimensions.area, 200.0);
    assert_eq!(copy.relative_size, 2.0);
}
