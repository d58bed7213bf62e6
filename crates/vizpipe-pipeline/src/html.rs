//! Result page emitter.

/// Build a minimal HTML document that redirects the viewer to the finished
/// plot. Stateless; the host writes it to the dataset's result path.
pub fn redirect_page(url: &str) -> String {
    format!(
        "<head><meta http-equiv='refresh' content='0; URL={}'></head>",
        url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_page_embeds_url() {
        let page = redirect_page("http://plot.example/plots/abc/index.html");
        assert_eq!(
            page,
            "<head><meta http-equiv='refresh' \
             content='0; URL=http://plot.example/plots/abc/index.html'></head>"
        );
    }
}
