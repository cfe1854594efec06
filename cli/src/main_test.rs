use super::*;

#[test]
fn ws_url_maps_scheme_and_session() {
    assert_eq!(ws_url("http://localhost:5001", "board").unwrap(), "ws://localhost:5001/ws/board");
    assert_eq!(ws_url("https://draw.example", "default").unwrap(), "wss://draw.example/ws/default");
    assert!(matches!(ws_url("ftp://x", "s"), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn parse_points_reads_pairs() {
    let points = parse_points("0,0  10.5,-2\n3,4", "#ff0000", 2.0).unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[1], Point::new(10.5, -2.0, "#ff0000", 2.0));
}

#[test]
fn parse_points_rejects_garbage() {
    assert!(matches!(parse_points("1,2 3", "#000", 1.0), Err(CliError::InvalidPoints(p)) if p == "3"));
    assert!(matches!(parse_points("a,b", "#000", 1.0), Err(CliError::InvalidPoints(_))));
}

#[test]
fn single_point_never_becomes_a_stroke() {
    let mut replica = Replica::default();
    let points = parse_points("5,5", "#000", 1.0).unwrap();
    assert!(matches!(stroke_from_points(&mut replica, points), Err(CliError::Stroke(_))));
    assert!(!replica.is_drawing());
}

#[test]
fn gesture_builds_stroke_in_order() {
    let mut replica = Replica::default();
    let stroke = stroke_from_points(&mut replica, parse_points("0,0 1,1 2,0", "#123", 4.0).unwrap()).unwrap();
    let xs: Vec<f64> = stroke.points().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    assert_eq!(stroke.color(), "#123");
}

#[test]
fn snapshot_input_accepts_body_and_bare_layout() {
    let bare = r##"[[{"x":0,"y":0,"color":"#000","size":3},{"x":1,"y":1,"color":"#000","size":3}]]"##;
    let body = format!(r#"{{"log":{bare}}}"#);
    assert_eq!(parse_snapshot_input(bare).unwrap().len(), 1);
    assert_eq!(parse_snapshot_input(&body).unwrap(), parse_snapshot_input(bare).unwrap());
    assert!(parse_snapshot_input("{}").is_err());
}
