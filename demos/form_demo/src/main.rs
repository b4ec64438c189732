use std::path::PathBuf;

use formgroup::*;
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("form_demo.json"));

    let css = CssHooks::new()
        .form_group("form-group")
        .heading("form-group__heading")
        .description("form-group__description")
        .component("form-group__component")
        .input("form-group__input");
    let form = FormGroup::create(&path, StoreOptions::new().indent_width(2), css)?;
    form.register_handler("save", |event, instance| {
        instance.set_state(event.value()).map(drop)
    });

    let name = form.input_group(
        GroupOptions::new("")
            .group_key("name")
            .heading("Name")
            .props(json!({ "placeholder": "Your name" }))
            .events(json!({ "input": "save" })),
    )?;
    let address = form.inputs_group(
        GroupOptions::new(json!(["", ""]))
            .group_key("address")
            .heading("Address")
            .description("Street and city")
            .props(json!([{ "placeholder": "Street" }, { "placeholder": "City" }]))
            .events(json!([{ "input": "save" }, { "input": "save" }])),
    )?;
    let tags = form.removable_inputs_group(
        GroupOptions::new(json!(["rust"]))
            .group_key("tags")
            .heading("Tags")
            .max(3)
            .events(json!({ "input": "save" })),
    )?;

    let name_input = form.instances("name")[0].node()?;
    form.input(name_input, "Ferris")?;
    for (instance, text) in form.instances("address").iter().zip(["1 Crab Way", "Rustville"]) {
        form.input(instance.node()?, text)?;
    }
    if let Some(tag) = form.add_instance("tags")? {
        form.input(tag.node()?, "forms")?;
    }
    // an empty tag disappears once it loses focus
    if let Some(tag) = form.add_instance("tags")? {
        form.blur(tag.node()?)?;
    }

    for root in [name, address, tags] {
        let mut markup = MarkupRenderer::pretty(2);
        form.render(root, &mut markup);
        println!("{}\n", markup.output());
    }

    log::info!("stored at {}", form.store_path().display());
    println!("{}", serde_json::to_string_pretty(&form.get_data()?)?);
    Ok(())
}
