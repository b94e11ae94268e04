//! Server-side HTML for the chat page. Pure functions of the transcript.

use crate::session::ChatTurn;

pub const PAGE_TITLE: &str = "📘 چت‌بات تصمیمات رهبران";
pub const INPUT_PLACEHOLDER: &str = "موضوع یا شرایط رخداد را وارد کنید.";

const STYLE: &str = r#"
body { direction: rtl; text-align: right; font-family: sans-serif; max-width: 760px; margin: 0 auto; padding: 1rem; }
h1 { direction: rtl; text-align: right; }
.chat-form input[type=text] { direction: rtl; text-align: right; width: 100%; padding: 10px; box-sizing: border-box; }
.user-msg { background-color: #DCF8C6; padding: 10px 15px; border-radius: 15px 15px 0px 15px; float: right; max-width: 80%; clear: both; margin: 4px 0; white-space: pre-wrap; }
.bot-msg { background-color: #ECECEC; padding: 10px 15px; border-radius: 15px 15px 15px 0px; float: left; max-width: 80%; clear: both; margin: 4px 0; white-space: pre-wrap; }
.timestamp { font-size: 0.7em; color: gray; display: block; margin-top: 2px; }
.clearfix { clear: both; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn render_turn(turn: &ChatTurn) -> String {
    let time = escape_html(&turn.timestamp);
    format!(
        "<div class=\"user-msg\">{}<span class=\"timestamp\">{}</span></div>\n\
         <div class=\"bot-msg\">{}<span class=\"timestamp\">{}</span></div>\n\
         <div class=\"clearfix\"></div>\n",
        escape_html(&turn.user_text),
        time,
        escape_html(&turn.bot_text),
        time
    )
}

pub fn render_transcript(turns: &[ChatTurn]) -> String {
    turns.iter().map(render_turn).collect()
}

/// Without a session id the form posts to `/chat`, which opens a session
/// on the first message.
pub fn render_page(session_id: Option<&str>, turns: &[ChatTurn]) -> String {
    let action = match session_id {
        Some(id) => format!("/chat/{}", escape_html(id)),
        None => "/chat".to_string(),
    };
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"fa\" dir=\"rtl\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>📘 Incident Decision Bot</title>\n\
         <style>{style}</style>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <div class=\"chat\">\n{transcript}</div>\n\
         <form class=\"chat-form\" method=\"post\" action=\"{action}\">\n\
         <input type=\"text\" name=\"message\" placeholder=\"{placeholder}\" autofocus autocomplete=\"off\">\n\
         </form>\n\
         </body>\n\
         </html>\n",
        style = STYLE,
        title = PAGE_TITLE,
        transcript = render_transcript(turns),
        action = action,
        placeholder = INPUT_PLACEHOLDER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, bot: &str) -> ChatTurn {
        ChatTurn {
            user_text: user.to_string(),
            bot_text: bot.to_string(),
            timestamp: "12:34:56".to_string(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"a\" & 'b'</b>"),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn turns_render_in_order_with_both_bubbles() {
        let html = render_transcript(&[turn("اول", "یک"), turn("دوم", "دو")]);

        let first = html.find("اول").unwrap();
        let second = html.find("دوم").unwrap();
        assert!(first < second);
        assert_eq!(html.matches("class=\"user-msg\"").count(), 2);
        assert_eq!(html.matches("class=\"bot-msg\"").count(), 2);
        assert_eq!(html.matches("12:34:56").count(), 4);
    }

    #[test]
    fn user_text_cannot_inject_markup() {
        let html = render_transcript(&[turn("<script>alert(1)</script>", "ok")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let turns = vec![turn("سلام", "درود"), turn("شرایط خاص", "تصمیم الف")];
        let snapshot = turns.clone();

        let first = render_page(Some("abc"), &turns);
        let second = render_page(Some("abc"), &turns);

        assert_eq!(first, second);
        assert_eq!(turns, snapshot);
    }

    #[test]
    fn page_has_title_placeholder_and_rtl() {
        let html = render_page(Some("abc"), &[]);
        assert!(html.contains(PAGE_TITLE));
        assert!(html.contains(INPUT_PLACEHOLDER));
        assert!(html.contains("dir=\"rtl\""));
        assert!(html.contains("action=\"/chat/abc\""));
    }

    #[test]
    fn sessionless_page_posts_to_chat_root() {
        let html = render_page(None, &[]);
        assert!(html.contains("action=\"/chat\""));
        assert!(!html.contains("user-msg\">"));
    }
}
