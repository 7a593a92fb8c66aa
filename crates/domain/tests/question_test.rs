use ferrous_forwarder_domain::{Question, SubnetPrefix};

#[test]
fn test_routing_name_strips_all_trailing_dots() {
    let q = Question::new("www.example.com..", 1, 1);
    assert_eq!(q.routing_name(), "www.example.com");
    assert_eq!(q.name, "www.example.com..");
}

#[test]
fn test_questions_differ_by_type() {
    let a = Question::new("example.com.", 1, 1);
    let aaaa = Question::new("example.com.", 1, 28);
    assert_ne!(a, aaaa);
    assert_eq!(a, Question::new("example.com.", 1, 1));
}

#[test]
fn test_subnet_without_prefix_is_host_length() {
    let v4: SubnetPrefix = "203.0.113.9".parse().unwrap();
    assert_eq!(v4.prefix, 32);
    let v6: SubnetPrefix = "2001:db8::1".parse().unwrap();
    assert_eq!(v6.prefix, 128);
    assert_eq!(v6.to_string(), "2001:db8::1/128");
}

#[test]
fn test_subnet_rejects_garbage() {
    assert!("not-an-ip/24".parse::<SubnetPrefix>().is_err());
    assert!("10.0.0.0/abc".parse::<SubnetPrefix>().is_err());
}
