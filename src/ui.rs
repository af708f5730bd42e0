use iocraft::prelude::*;

#[derive(Default, Props)]
pub struct MetadataTableProps {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

#[component]
pub fn MetadataTable(props: &MetadataTableProps) -> impl Into<AnyElement<'static>> {
    let key_width = props
        .rows
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(0);

    element! {
        View(flex_direction: FlexDirection::Column) {
            View(flex_direction: FlexDirection::Row) {
                Text(content: "┌ ")
                View(background_color: Color::Blue) {
                    Text(content: &props.title, color: Color::White)
                }
            }
            #(props.rows.iter().map(|(key, value)| {
                element! {
                    View(flex_direction: FlexDirection::Row) {
                        Text(content: "│ ")
                        Text(weight: Weight::Bold, content: format!("{:<width$}  ", key, width = key_width))
                        Text(content: value.clone())
                    }
                }
            }))
            Text(content: "└")
        }
    }
}

#[derive(Default, Props)]
pub struct MessageProps {
    pub message: String,
}

#[component]
pub fn SuccessMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Green, content: "◆ ")
            Text(content: &props.message)
        }
    }
}

#[component]
pub fn ErrorMessage(props: &MessageProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Text(color: Color::Red, content: "▲ ")
            Text(color: Color::Red, content: &props.message)
        }
    }
}

#[component]
pub fn ConfigHeader() -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Column) {
            View(background_color: Color::Blue) {
                Text(content: " nhost-storage configuration ", color: Color::White, weight: Weight::Bold)
            }
            Text(content: "Press enter to accept the value in brackets.")
        }
    }
}

#[derive(Default, Props)]
pub struct InputPromptProps {
    pub prompt: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

#[component]
pub fn InputPrompt(props: &InputPromptProps) -> impl Into<AnyElement<'static>> {
    let prompt = match &props.default {
        Some(default) => format!("{} [{}]", props.prompt, default),
        None => props.prompt.clone(),
    };

    element! {
        View(flex_direction: FlexDirection::Column) {
            Text(weight: Weight::Bold, content: prompt)
            #(props.description.as_ref().map(|description| element! {
                Text(color: Color::DarkGrey, content: description.clone())
            }))
        }
    }
}

#[derive(Default, Props)]
pub struct SpinnerProps {
    pub color: Option<Color>,
}

#[component]
pub fn Spinner(props: &SpinnerProps, mut hooks: Hooks) -> impl Into<AnyElement<'static>> {
    let mut frame = hooks.use_state(|| 0usize);

    hooks.use_future(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
            frame.set((frame.get() + 1) % 4);
        }
    });

    let spinner_chars = ["◐", "◓", "◑", "◒"];
    let current_char = spinner_chars[*frame.read()];
    let color = props.color.unwrap_or(Color::Cyan);

    element! {
        Text(content: current_char, color: color)
    }
}

#[derive(Default, Props)]
pub struct WorkingProps {
    pub label: String,
}

#[component]
pub fn Working(props: &WorkingProps) -> impl Into<AnyElement<'static>> {
    element! {
        View(flex_direction: FlexDirection::Row) {
            Spinner()
            Text(content: format!(" {}…", props.label))
        }
    }
}
