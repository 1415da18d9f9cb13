use super::{channel_href, day_href};
use super::text::escape_html;
use crate::archive::config::OutputFormat;
use chrono::NaiveDate;

pub fn robots_txt(site_base_url: &str) -> String {
    format!("User-agent: *\nAllow: /\nSitemap: {site_base_url}/sitemap.xml\n")
}

/// Sitemap over the root, every channel index and every day page.
pub fn sitemap_xml(
    site_base_url: &str,
    format: OutputFormat,
    channels: &[(String, Vec<NaiveDate>)],
) -> String {
    let mut locations = vec![format!("{site_base_url}/")];
    for (channel, dates) in channels {
        locations.push(format!("{site_base_url}/{}", channel_href(format, channel)));
        for date in dates {
            locations.push(format!("{site_base_url}/{}", day_href(format, channel, *date)));
        }
    }

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for loc in locations {
        out.push_str(&format!("  <url><loc>{}</loc></url>\n", escape_html(&loc)));
    }
    out.push_str("</urlset>\n");
    out
}
