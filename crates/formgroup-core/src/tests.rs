#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::{Value, json};

    use crate::*;

    #[test]
    fn test_append_moves_existing_child() {
        let mut doc = Document::new();
        let root = doc.create_element(ElementKind::Container);
        let a = doc.create_element(ElementKind::Input);
        let b = doc.create_element(ElementKind::Input);
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(root, a);

        assert_eq!(doc.children(root), &[b, a]);
        assert_eq!(doc.child_index(root, a), Some(1));
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut doc = Document::new();
        let left = doc.create_element(ElementKind::Container);
        let right = doc.create_element(ElementKind::Container);
        let child = doc.create_element(ElementKind::Input);
        doc.append_child(left, child);
        doc.append_child(right, child);

        assert!(doc.children(left).is_empty());
        assert_eq!(doc.parent(child), Some(right));
    }

    #[test]
    fn test_remove_and_reinsert_child() {
        let mut doc = Document::new();
        let root = doc.create_element(ElementKind::Container);
        let kids: Vec<_> = (0..3)
            .map(|_| doc.create_element(ElementKind::Input))
            .collect();
        for &k in &kids {
            doc.append_child(root, k);
        }

        assert_eq!(doc.remove_child(root, kids[1]), Some(1));
        assert_eq!(doc.children(root), &[kids[0], kids[2]]);
        assert_eq!(doc.remove_child(root, kids[1]), None);

        doc.insert_child(root, 1, kids[1]);
        assert_eq!(doc.children(root), &kids[..]);
    }

    #[test]
    fn test_remove_subtree_frees_descendants() {
        let mut doc = Document::new();
        let root = doc.create_element(ElementKind::Container);
        let wrapper = doc.create_element(ElementKind::Container);
        let input = doc.create_element(ElementKind::Input);
        doc.append_child(root, wrapper);
        doc.append_child(wrapper, input);
        doc.focus(input);

        doc.remove_subtree(wrapper);

        assert!(doc.children(root).is_empty());
        assert!(!doc.contains_node(wrapper));
        assert!(!doc.contains_node(input));
        assert_eq!(doc.focused(), None);
        assert_eq!(doc.len(), 1);

        // stale ids are ignored
        doc.set_attribute(input, "value", "x");
        assert_eq!(doc.attribute(input, "value"), None);
    }

    #[test]
    fn test_listeners_filtered_by_event_in_binding_order() {
        let mut doc = Document::new();
        let input = doc.create_element(ElementKind::Input);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            doc.add_event_listener(
                input,
                INPUT,
                Rc::new(move |_: &Event| {
                    seen.borrow_mut().push(tag);
                    Ok(())
                }),
            );
        }
        doc.add_event_listener(input, BLUR, Rc::new(|_: &Event| Ok(())));

        let listeners = doc.listeners(input, INPUT);
        assert_eq!(listeners.len(), 2);
        for l in listeners {
            l(&Event::new(INPUT, input)).unwrap();
        }
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
        assert_eq!(doc.listeners(input, CLICK).len(), 0);
    }

    #[test]
    fn test_class_string() {
        assert_eq!(class_string("", None), "");
        assert_eq!(class_string("a", None), "a");
        assert_eq!(class_string("", Some("b")), "b");
        assert_eq!(class_string("a", Some("b")), "a b");
        assert_eq!(class_string("a", Some("")), "a");
    }

    #[test]
    fn test_canonical_state_blanks_invalid_value() {
        let map = json!({ "value": true, "placeholder": "p" });
        let Value::Object(map) = map else { unreachable!() };
        let state = StateRecord::canonical(map);
        assert_eq!(state.value(), Some(&json!("")));
        assert_eq!(state.get("placeholder"), Some(&json!("p")));

        let Value::Object(missing) = json!({ "title": "t" }) else {
            unreachable!()
        };
        assert!(StateRecord::canonical(missing).is_empty_value());
    }

    #[test]
    fn test_numeric_zero_is_not_empty() {
        assert!(!StateRecord::new(0).is_empty_value());
        assert!(StateRecord::new("").is_empty_value());
        assert_eq!(StateRecord::new(12).value_text(), "12");
    }

    #[test]
    fn test_private_properties_not_reflected() {
        let mut props = Properties::new();
        props.insert("placeholder", "name");
        props.insert("_regex", "[^a-z]");
        props.insert("__deep", 1);

        let reflected: Vec<_> = props.reflected().map(|(k, _)| k.as_str()).collect();
        assert_eq!(reflected, vec!["placeholder"]);
        assert_eq!(props.get_str("_regex"), Some("[^a-z]"));
    }

    #[test]
    fn test_snapshot_preserves_group_order() {
        let mut snap = Snapshot::new();
        snap.insert("zeta", vec![StateRecord::new(1)]);
        snap.insert("alpha", vec![]);
        let text = serde_json::to_string(&snap).unwrap();
        assert_eq!(text, r#"{"zeta":[{"value":1}],"alpha":[]}"#);

        let back: Snapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(back, snap);
    }

    #[test]
    fn test_markup_renderer() {
        let mut doc = Document::new();
        let root = doc.create_element(ElementKind::Container);
        doc.set_attribute(root, "class", "group");
        let heading = doc.create_element(ElementKind::Heading);
        doc.set_text(heading, "Name & <title>");
        let input = doc.create_element(ElementKind::Input);
        doc.set_attribute(input, "value", "say \"hi\"");
        doc.append_child(root, heading);
        doc.append_child(root, input);

        let mut flat = MarkupRenderer::new();
        flat.commit(&doc, root);
        assert_eq!(
            flat.output(),
            "<div class=\"group\"><h3>Name &amp; &lt;title&gt;</h3><input value=\"say &quot;hi&quot;\"></div>"
        );

        let mut pretty = MarkupRenderer::pretty(2);
        pretty.commit(&doc, root);
        assert_eq!(
            pretty.output(),
            "<div class=\"group\">\n  <h3>Name &amp; &lt;title&gt;</h3>\n  <input value=\"say &quot;hi&quot;\">\n</div>"
        );
    }
}
