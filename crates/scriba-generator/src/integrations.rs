//! Third-party service snippets selected by the site configuration.
//!
//! Each function returns an empty string when its provider is absent or lacks
//! its settings block, so templates can place the result unconditionally.

use scriba_core::{
    Config,
    config::{
        ActiveComments, ActiveSearch, AnalyticsConfig, AnalyticsProvider, DisqusConfig,
        GiscusConfig, UtterancesConfig,
    },
};
use scriba_parser::html_escape;

/// Analytics tags for the document head.
pub fn analytics_html(analytics: &AnalyticsConfig) -> String {
    analytics
        .providers()
        .into_iter()
        .map(|provider| match provider {
            AnalyticsProvider::Google { measurement_id } => {
                let id = html_escape(measurement_id);
                format!(
                    r#"<script async src="https://www.googletagmanager.com/gtag/js?id={id}"></script>
<script>window.dataLayer=window.dataLayer||[];function gtag(){{dataLayer.push(arguments);}}gtag('js',new Date());gtag('config','{id}',{{page_path:window.location.pathname}});</script>"#
                )
            }
            AnalyticsProvider::Umami { website_id } => format!(
                r#"<script async defer data-website-id="{}" src="https://analytics.umami.is/script.js"></script>"#,
                html_escape(website_id)
            ),
            AnalyticsProvider::Plausible { data_domain } => format!(
                r#"<script defer data-domain="{}" src="https://plausible.io/js/plausible.js"></script>"#,
                html_escape(data_domain)
            ),
            AnalyticsProvider::Posthog { api_key } => format!(
                r#"<script>!function(t,e){{var o,n,p,r;e.__SV||(window.posthog=e,e._i=[],e.init=function(i,s,a){{var g=function(t,e){{var o=e.split(".");2==o.length&&(t=t[o[0]],e=o[1]),t[e]=function(){{t.push([e].concat(Array.prototype.slice.call(arguments,0)))}}}};(p=t.createElement("script")).type="text/javascript",p.async=!0,p.src=s.api_host+"/static/array.js",(r=t.getElementsByTagName("script")[0]).parentNode.insertBefore(p,r);var u=e;for(void 0!==a?u=e[a]=[]:a="posthog",u.people=u.people||[],n=["capture","identify","alias","people.set","people.set_once","set_config","register","register_once","unregister","opt_out_capturing","has_opted_out_capturing","opt_in_capturing","reset"],o=0;o<n.length;o++)g(u,n[o]);e._i.push([i,s,a])}},e.__SV=1)}}(document,window.posthog||[]);posthog.init('{}',{{api_host:'https://app.posthog.com'}});</script>"#,
                html_escape(api_key)
            ),
            AnalyticsProvider::SimpleAnalytics => {
                r#"<script async defer src="https://scripts.simpleanalyticscdn.com/latest.js"></script>
<noscript><img src="https://queue.simpleanalyticscdn.com/noscript.gif" alt="" referrerpolicy="no-referrer-when-downgrade" /></noscript>"#
                    .to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comment widget for a post page.
pub fn comments_html(config: &Config, page_url: &str, page_id: &str) -> String {
    let Some(active) = config.comments.as_ref().and_then(|c| c.active()) else {
        return String::new();
    };

    let widget = match active {
        ActiveComments::Giscus(giscus) => giscus_html(giscus),
        ActiveComments::Utterances(utterances) => utterances_html(utterances),
        ActiveComments::Disqus(disqus) => disqus_html(disqus, page_url, page_id),
    };

    format!(r#"<section class="comments" id="comment">{widget}</section>"#)
}

fn giscus_html(giscus: &GiscusConfig) -> String {
    let theme_attr = if giscus.theme_url.is_empty() {
        String::new()
    } else {
        format!(r#" data-theme-url="{}""#, html_escape(&giscus.theme_url))
    };

    format!(
        r#"<div class="giscus" data-light-theme="{light}" data-dark-theme="{dark}"{theme_attr}></div>
<script src="https://giscus.app/client.js" data-repo="{repo}" data-repo-id="{repo_id}" data-category="{category}" data-category-id="{category_id}" data-mapping="{mapping}" data-reactions-enabled="{reactions}" data-emit-metadata="{metadata}" data-input-position="top" data-theme="{light}" data-lang="{lang}" crossorigin="anonymous" async></script>
<script>
    (function () {{
        var el = document.querySelector('.giscus');
        function sync() {{
            var frame = document.querySelector('iframe.giscus-frame');
            var theme = document.documentElement.classList.contains('dark') ? el.dataset.darkTheme : el.dataset.lightTheme;
            if (frame) frame.contentWindow.postMessage({{ giscus: {{ setConfig: {{ theme: theme }} }} }}, 'https://giscus.app');
        }}
        new MutationObserver(sync).observe(document.documentElement, {{ attributes: true, attributeFilter: ['class'] }});
    }})();
</script>"#,
        light = html_escape(&giscus.theme),
        dark = html_escape(&giscus.dark_theme),
        repo = html_escape(&giscus.repo),
        repo_id = html_escape(&giscus.repository_id),
        category = html_escape(&giscus.category),
        category_id = html_escape(&giscus.category_id),
        mapping = html_escape(&giscus.mapping),
        reactions = html_escape(&giscus.reactions),
        metadata = html_escape(&giscus.metadata),
        lang = html_escape(&giscus.lang),
    )
}

fn utterances_html(utterances: &UtterancesConfig) -> String {
    let label = if utterances.label.is_empty() {
        String::new()
    } else {
        format!(r#" label="{}""#, html_escape(&utterances.label))
    };

    format!(
        r#"<script src="https://utteranc.es/client.js" repo="{repo}" issue-term="{term}"{label} theme="{theme}" data-dark-theme="{dark}" crossorigin="anonymous" async></script>"#,
        repo = html_escape(&utterances.repo),
        term = html_escape(&utterances.issue_term),
        theme = html_escape(&utterances.theme),
        dark = html_escape(&utterances.dark_theme),
    )
}

fn disqus_html(disqus: &DisqusConfig, page_url: &str, page_id: &str) -> String {
    format!(
        r#"<div id="disqus_thread"></div>
<script>
    var disqus_config = function () {{ this.page.url = '{url}'; this.page.identifier = '{id}'; }};
    (function () {{
        var s = document.createElement('script');
        s.src = 'https://{shortname}.disqus.com/embed.js';
        s.setAttribute('data-timestamp', +new Date());
        document.body.appendChild(s);
    }})();
</script>"#,
        url = html_escape(page_url),
        id = html_escape(page_id),
        shortname = html_escape(&disqus.shortname),
    )
}

/// Search entry point shown in the header.
pub fn search_button_html(config: &Config) -> String {
    match config.search.as_ref().and_then(|s| s.active()) {
        Some(ActiveSearch::Kbar(_)) => {
            r#"<button type="button" class="search-toggle" aria-label="Search" data-search-open>&#128269;</button>"#
                .to_string()
        }
        Some(ActiveSearch::Algolia(_)) => {
            r#"<div id="docsearch" class="search-toggle"></div>"#.to_string()
        }
        None => String::new(),
    }
}

/// Search assets appended to the document body.
pub fn search_script_html(config: &Config) -> String {
    match config.search.as_ref().and_then(|s| s.active()) {
        Some(ActiveSearch::Kbar(kbar)) => {
            let path = format!("/{}", kbar.search_documents_path.trim_start_matches('/'));
            format!(
                r#"<dialog class="search-dialog" id="search-dialog">
    <input type="search" placeholder="Type a command or search…" aria-label="Search" autofocus>
    <ul class="search-results"></ul>
</dialog>
<script>
    (function () {{
        var dialog = document.getElementById('search-dialog');
        var input = dialog.querySelector('input');
        var list = dialog.querySelector('.search-results');
        var docs = null;
        function load() {{
            if (docs) return Promise.resolve(docs);
            return fetch('{path}').then(function (r) {{ return r.json(); }}).then(function (d) {{ docs = d; return d; }});
        }}
        function render(q) {{
            q = q.trim().toLowerCase();
            load().then(function (all) {{
                var hits = all.filter(function (d) {{
                    return !q || d.title.toLowerCase().includes(q) || d.summary.toLowerCase().includes(q) || d.tags.join(' ').toLowerCase().includes(q);
                }}).slice(0, 10);
                list.innerHTML = hits.map(function (d) {{
                    return '<li><a href="/' + d.path + '">' + d.title.replace(/</g, '&lt;') + '</a></li>';
                }}).join('');
            }});
        }}
        function open() {{ dialog.showModal(); render(''); input.focus(); }}
        document.querySelectorAll('[data-search-open]').forEach(function (b) {{ b.addEventListener('click', open); }});
        document.addEventListener('keydown', function (e) {{
            if ((e.metaKey || e.ctrlKey) && e.key === 'k') {{ e.preventDefault(); open(); }}
        }});
        input.addEventListener('input', function () {{ render(input.value); }});
    }})();
</script>"#
            )
        }
        Some(ActiveSearch::Algolia(algolia)) => format!(
            r#"<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@docsearch/css@3">
<script src="https://cdn.jsdelivr.net/npm/@docsearch/js@3"></script>
<script>docsearch({{ container: '#docsearch', appId: '{app_id}', apiKey: '{api_key}', indexName: '{index}' }});</script>"#,
            app_id = html_escape(&algolia.app_id),
            api_key = html_escape(&algolia.api_key),
            index = html_escape(&algolia.index_name),
        ),
        None => String::new(),
    }
}

/// Newsletter sign-up form posting to the configured endpoint.
pub fn newsletter_html(config: &Config) -> String {
    let Some(newsletter) = &config.newsletter else {
        return String::new();
    };

    format!(
        r#"<form class="newsletter" action="{endpoint}" method="post" data-provider="{provider}">
    <p class="newsletter-title">Subscribe to the newsletter</p>
    <label for="newsletter-email" class="sr-only">Email address</label>
    <input id="newsletter-email" name="email" type="email" autocomplete="email" placeholder="Enter your email" required>
    <button type="submit">Sign up</button>
</form>"#,
        endpoint = html_escape(&newsletter.endpoint),
        provider = newsletter.provider.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use scriba_core::MapEnv;

    use super::*;

    fn config(extra: &str) -> Config {
        let toml = format!("title = \"Blog\"\nsiteUrl = \"https://example.com\"\n{extra}");
        Config::from_toml_str(&toml, &MapEnv::new()).unwrap()
    }

    #[test]
    fn test_no_integrations_render_nothing() {
        let config = config("");

        assert!(analytics_html(&config.analytics).is_empty());
        assert!(comments_html(&config, "https://example.com/blog/a", "blog/a").is_empty());
        assert!(search_button_html(&config).is_empty());
        assert!(search_script_html(&config).is_empty());
        assert!(newsletter_html(&config).is_empty());
    }

    #[test]
    fn test_analytics_snippets() {
        let config = config(
            "[analytics]\ngoogleAnalyticsId = \"G-123\"\nplausibleDataDomain = \"example.com\"\nsimpleAnalytics = true\n",
        );
        let html = analytics_html(&config.analytics);

        assert!(html.contains("gtag/js?id=G-123"));
        assert!(html.contains(r#"data-domain="example.com""#));
        assert!(html.contains("simpleanalyticscdn.com"));
        assert!(!html.contains("umami"));
    }

    #[test]
    fn test_giscus_widget() {
        let config = config(
            "[comments]\nprovider = \"giscus\"\n[comments.giscusConfig]\nrepo = \"me/blog\"\nrepositoryId = \"R_1\"\ncategory = \"General\"\ncategoryId = \"C_1\"\n",
        );
        let html = comments_html(&config, "https://example.com/blog/a", "blog/a");

        assert!(html.contains(r#"data-repo="me/blog""#));
        assert!(html.contains(r#"data-mapping="pathname""#));
        assert!(html.contains(r#"data-dark-theme="transparent_dark""#));
    }

    #[test]
    fn test_provider_without_settings_renders_nothing() {
        let config = config("[comments]\nprovider = \"utterances\"\n[search]\nprovider = \"algolia\"\n");

        assert!(comments_html(&config, "u", "i").is_empty());
        assert!(search_button_html(&config).is_empty());
    }

    #[test]
    fn test_disqus_widget() {
        let config = config("[comments]\nprovider = \"disqus\"\n[comments.disqusConfig]\nshortname = \"myblog\"\n");
        let html = comments_html(&config, "https://example.com/blog/a", "blog/a");

        assert!(html.contains("https://myblog.disqus.com/embed.js"));
        assert!(html.contains("this.page.identifier = 'blog/a'"));
    }

    #[test]
    fn test_kbar_search() {
        let config = config("[search]\nprovider = \"kbar\"\n[search.kbarConfig]\nsearchDocumentsPath = \"search.json\"\n");

        assert!(search_button_html(&config).contains("data-search-open"));
        assert!(search_script_html(&config).contains("fetch('/search.json')"));
    }

    #[test]
    fn test_newsletter_form() {
        let config = config("[newsletter]\nprovider = \"buttondown\"\n");
        let html = newsletter_html(&config);

        assert!(html.contains(r#"action="/api/newsletter""#));
        assert!(html.contains(r#"data-provider="buttondown""#));
    }
}
