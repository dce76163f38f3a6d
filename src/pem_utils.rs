/// PEM label of an X.509 certificate.
pub const CERTIFICATE: &str = "CERTIFICATE";
/// PEM label of a PKCS#10 certificate signing request.
pub const CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";
/// PEM label of a certificate revocation list.
pub const X509_CRL: &str = "X509 CRL";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Returns the contents of the first PEM block when it carries `label`.
///
/// `None` when the text holds no PEM block or the first block has a
/// different label.
pub fn first_block(pem_str: &str, label: &str) -> Option<Vec<u8>> {
    let block = pem::parse(pem_str).ok()?;
    (block.tag() == label).then(|| block.into_contents())
}

/// Returns the contents of every PEM block labeled `label`, skipping others.
pub fn blocks_with_label(pem_str: &str, label: &str) -> Vec<Vec<u8>> {
    pem::parse_many(pem_str)
        .unwrap_or_default()
        .into_iter()
        .filter(|block| block.tag() == label)
        .map(pem::Pem::into_contents)
        .collect()
}
