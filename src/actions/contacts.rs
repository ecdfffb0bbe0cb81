//! Contact list builtins: `collect_emails` and `emails_to_urls`.
use super::csv::Table;
use crate::paths::PipelinePaths;
use crate::util::write_atomic;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::sync::OnceLock;

/// Header names recognised as the email column, in preference order.
pub const EMAIL_COLUMNS: [&str; 3] = ["email", "emails", "email_address"];

const MAX_DOMAIN_LEN: usize = 253;

/// Verify the contacts CSV and report how many rows it holds.
pub fn collect_emails(paths: &PipelinePaths) -> Result<String> {
    let table = Table::read(&paths.contacts_path())?;
    let rows = table.rows.len();
    let Some(column) = table.column(&EMAIL_COLUMNS) else {
        return Ok(format!("{rows} contacts (no email column)"));
    };
    let with_email = table
        .rows
        .iter()
        .filter(|row| !table.cell(row, column).is_empty())
        .count();
    Ok(format!("{rows} contacts, {with_email} with email"))
}

/// Derive `https://<domain>` audit targets from contact email addresses.
pub fn emails_to_urls(paths: &PipelinePaths) -> Result<String> {
    let contacts = paths.contacts_path();
    let urls = paths.urls_path();
    if !contacts.is_file() {
        // A list left over from earlier contacts must not feed the audit.
        if urls.is_file() {
            fs::remove_file(&urls).with_context(|| format!("remove {}", urls.display()))?;
            tracing::info!(path = %urls.display(), "removed stale url list");
        }
        return Err(anyhow!(
            "contacts CSV not found ({})",
            paths.rel_path(&contacts)
        ));
    }
    let table = Table::read(&contacts)?;
    let column = table.column(&EMAIL_COLUMNS).ok_or_else(|| {
        anyhow!(
            "no email column in {} (expected one of {})",
            paths.rel_path(&contacts),
            EMAIL_COLUMNS.join(", ")
        )
    })?;

    let mut domains = BTreeSet::new();
    let mut rejected = 0usize;
    for row in &table.rows {
        for address in split_addresses(table.cell(row, column)) {
            match email_domain(address) {
                Some(domain) => {
                    domains.insert(domain);
                }
                None => rejected += 1,
            }
        }
    }
    if domains.is_empty() {
        return Err(anyhow!("no valid email domains in {}", paths.rel_path(&contacts)));
    }

    let mut text = String::new();
    for domain in &domains {
        text.push_str("https://");
        text.push_str(domain);
        text.push('\n');
    }
    write_atomic(&urls, text.as_bytes())?;
    tracing::debug!(count = domains.len(), rejected, "wrote url list");
    Ok(format!(
        "{} urls written to {} ({rejected} rejected)",
        domains.len(),
        paths.rel_path(&urls)
    ))
}

/// A cell may hold several addresses separated by `;`, `,` or whitespace.
fn split_addresses(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(|ch: char| ch == ';' || ch == ',' || ch.is_whitespace())
        .map(|part| part.trim_matches(|ch: char| ch == '<' || ch == '>' || ch == '"'))
        .filter(|part| !part.is_empty())
}

fn email_domain(address: &str) -> Option<String> {
    let address = address.strip_prefix("mailto:").unwrap_or(address);
    let (local, host) = address.rsplit_once('@')?;
    if local.is_empty() {
        return None;
    }
    let domain = normalize_domain(host);
    is_valid_domain(&domain).then_some(domain)
}

/// Reduce a URL or host string to a bare lowercase domain.
pub fn normalize_domain(raw: &str) -> String {
    let mut host = raw.trim();
    if let Some((_, rest)) = host.split_once("//") {
        host = rest;
    }
    host = host.split('/').next().unwrap_or_default();
    host = host.split(':').next().unwrap_or_default();
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Whether a normalized domain is a public hostname worth auditing.
pub fn is_valid_domain(domain: &str) -> bool {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    let label = LABEL.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("label pattern is valid")
    });
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN || !domain.contains('.') {
        return false;
    }
    if domain == "localhost" || domain.ends_with(".localhost") {
        return false;
    }
    if domain.parse::<IpAddr>().is_ok() {
        return false;
    }
    let tld_is_alpha = domain
        .rsplit('.')
        .next()
        .is_some_and(|tld| tld.chars().all(|ch| ch.is_ascii_alphabetic()));
    tld_is_alpha && domain.split('.').all(|part| label.is_match(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths_with_contacts(csv: &str) -> (tempfile::TempDir, PipelinePaths) {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());
        fs::create_dir_all(paths.contacts_dir()).expect("mkdir");
        fs::write(paths.contacts_path(), csv).expect("write contacts");
        (dir, paths)
    }

    #[test]
    fn normalizes_scheme_path_port_and_www() {
        assert_eq!(normalize_domain("https://WWW.Example.com:8443/a/b"), "example.com");
        assert_eq!(normalize_domain(" shop.example.co.uk. "), "shop.example.co.uk");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn rejects_local_ip_and_malformed_hosts() {
        for good in ["example.com", "sub.example.co.uk", "a-b.io"] {
            assert!(is_valid_domain(good), "{good}");
        }
        let too_long = format!("{}.com", "a".repeat(254));
        for bad in [
            "",
            "localhost",
            "127.0.0.1",
            "0.0.0.0",
            "192.168.1.1",
            "no-tld",
            "-bad.com",
            "under_score.com",
            too_long.as_str(),
        ] {
            assert!(!is_valid_domain(bad), "{bad}");
        }
    }

    #[test]
    fn collect_emails_counts_rows() {
        let (_dir, paths) = paths_with_contacts("name,Email\nA,a@acme.io\nB,\nC,c@beta.dev\n");
        assert_eq!(collect_emails(&paths).expect("count"), "3 contacts, 2 with email");
    }

    #[test]
    fn emails_to_urls_dedupes_and_sorts_domains() {
        let (_dir, paths) = paths_with_contacts(
            "name,email\n\
             Zed,zed@zeta.com\n\
             Ann,\"ann@www.Acme.io; sales@acme.io\"\n\
             Bad,root@localhost\n\
             Ip,x@10.0.0.1\n\
             Junk,not-an-address\n",
        );

        let summary = emails_to_urls(&paths).expect("urls");

        let urls = fs::read_to_string(paths.urls_path()).expect("read urls");
        assert_eq!(urls, "https://acme.io\nhttps://zeta.com\n");
        assert!(summary.starts_with("2 urls written"));
        assert!(summary.ends_with("(3 rejected)"));
    }

    #[test]
    fn emails_to_urls_requires_contacts_and_email_column() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = PipelinePaths::new(dir.path().to_path_buf());
        let err = emails_to_urls(&paths).expect_err("missing contacts");
        assert!(err.to_string().contains("contacts CSV not found"));

        let (_dir, paths) = paths_with_contacts("name,phone\nA,123\n");
        let err = emails_to_urls(&paths).expect_err("no column");
        assert!(err.to_string().contains("no email column"));
        assert!(!paths.urls_path().exists());
    }

    #[test]
    fn emails_to_urls_drops_stale_list_when_contacts_are_gone() {
        let (_dir, paths) = paths_with_contacts("name,email\nAnn,ann@acme.io\n");
        emails_to_urls(&paths).expect("urls");
        assert!(paths.urls_path().is_file());

        fs::remove_file(paths.contacts_path()).expect("remove contacts");
        let err = emails_to_urls(&paths).expect_err("missing contacts");

        assert!(err.to_string().contains("contacts CSV not found"));
        assert!(!paths.urls_path().exists());
    }
}
