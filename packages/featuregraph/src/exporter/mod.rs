//! Serialization of a feature graph as a WFS 2.0 / GML 3.2 document.
//!
//! Every feature is written with content at most once per export. Later
//! occurrences become `xlink:href="#id"` references, which keeps shared
//! and cyclic structures finite. Features that end up referenced but never
//! written (by-reference properties, exhausted depth) are appended at the
//! root level so every local reference has a target in the output. That
//! list is computed by a planning walk over a discarding sink before the
//! real output is streamed.

mod dereference;
mod session;

pub use dereference::{ExternalResolver, HttpResolver};

use std::io::{self, Write};
use std::rc::Rc;

use url::Url;

use self::session::{ExportSession, FeatureKey};
use crate::config::{get_object_url, ExportConfig, GML_NS, WFS_NS, XLINK_NS};
use crate::envelope::EnvelopeCalculator;
use crate::error::{FeatureError, Result};
use crate::geometry::{merge_optional, AxisOrder, Envelope, GeometryAdapter};
use crate::model::{FeatureBody, FeatureGraph, FeatureHandle, FeatureProperty, PropertyValue};
use crate::parser::{DocumentParser, ParsedDocument, ParserOptions};
use crate::schema::{FeatureTypeLookup, QName, Representation, TypeOrigin};
use crate::validator::check_structure;
use crate::xml::{NamespacePrefixes, XmlWriter};

/// Remaining nesting budget; `None` is unbounded.
type Depth = Option<u32>;

fn exhausted(depth: Depth) -> bool {
    depth == Some(0)
}

fn nested(depth: Depth) -> Depth {
    depth.map(|d| d.saturating_sub(1))
}

/// Summary of one export.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Features written at the root level, out-of-band features included.
    pub number_of_features: usize,
    /// Ids of features appended at the root because they were only referenced.
    pub out_of_band: Vec<String>,
    /// External references that could not be inlined.
    pub reference_errors: Vec<FeatureError>,
}

/// Graph a feature is written from.
#[derive(Clone, Copy)]
struct Source<'g> {
    graph: &'g FeatureGraph,
    /// URL of a fetched document; `None` for the exported graph.
    document_url: Option<&'g str>,
}

impl Source<'_> {
    fn key(&self, handle: FeatureHandle) -> FeatureKey {
        FeatureKey {
            document: self.document_url.map(str::to_string),
            handle,
        }
    }
}

/// Writes feature graphs as XML.
pub struct Exporter<'a> {
    lookup: &'a dyn FeatureTypeLookup,
    adapter: &'a dyn GeometryAdapter,
    resolver: Option<&'a dyn ExternalResolver>,
    config: ExportConfig,
}

impl<'a> Exporter<'a> {
    /// Create an exporter with default settings and no external resolver.
    #[must_use]
    pub fn new(lookup: &'a dyn FeatureTypeLookup, adapter: &'a dyn GeometryAdapter) -> Self {
        Self {
            lookup,
            adapter,
            resolver: None,
            config: ExportConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `resolver` to fetch external references within the depth budget.
    #[must_use]
    pub fn with_resolver(mut self, resolver: &'a dyn ExternalResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Write the document rooted at `root`.
    ///
    /// A collection root becomes the document element with one `wfs:member`
    /// per member. A plain feature root is written as is, or wrapped in a
    /// `wfs:FeatureCollection` when out-of-band features must follow it.
    ///
    /// # Errors
    /// Fails on unresolved references, envelopes in different CRSs and
    /// declared features violating their type. Dereference failures are
    /// not errors; they are collected in [`ExportReport::reference_errors`].
    pub fn export(&self, graph: &FeatureGraph, root: FeatureHandle, out: &mut dyn Write) -> Result<ExportReport> {
        let out_of_band = self.plan(graph, root)?;

        let mut session = ExportSession::new(
            self.config.dereference_external && self.resolver.is_some(),
            graph,
        );
        let mut writer = XmlWriter::new(out, self.prefixes());
        writer.declaration()?;
        let number_of_features = Pass {
            exporter: self,
            session: &mut session,
            writer: &mut writer,
        }
        .root(graph, root, &out_of_band)?;
        writer.finish()?;

        tracing::debug!(
            features = number_of_features,
            out_of_band = out_of_band.len(),
            reference_errors = session.reference_errors.len(),
            "exported document"
        );

        Ok(ExportReport {
            number_of_features,
            out_of_band: out_of_band.iter().map(|h| graph.feature_id(*h)).collect(),
            reference_errors: session.reference_errors,
        })
    }

    /// Export into a string.
    pub fn export_to_string(&self, graph: &FeatureGraph, root: FeatureHandle) -> Result<(String, ExportReport)> {
        let mut buffer = Vec::new();
        let report = self.export(graph, root, &mut buffer)?;
        let xml = String::from_utf8(buffer)
            .map_err(|e| FeatureError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        Ok((xml, report))
    }

    /// Find the out-of-band features by walking without output until no
    /// new local reference target turns up.
    fn plan(&self, graph: &FeatureGraph, root: FeatureHandle) -> Result<Vec<FeatureHandle>> {
        let mut out_of_band: Vec<FeatureHandle> = Vec::new();
        loop {
            let mut session = ExportSession::new(false, graph);
            let mut sink = io::sink();
            let mut writer = XmlWriter::new(&mut sink, self.prefixes());
            Pass {
                exporter: self,
                session: &mut session,
                writer: &mut writer,
            }
            .root(graph, root, &out_of_band)?;

            let missing = session.missing();
            if missing.is_empty() {
                return Ok(session.root_out_of_band);
            }
            tracing::debug!(count = missing.len(), "referenced features not written yet");
            out_of_band.extend(missing);
        }
    }

    fn prefixes(&self) -> NamespacePrefixes {
        let mut prefixes = NamespacePrefixes::default();
        for (prefix, namespace) in self.lookup.namespace_prefixes() {
            prefixes.register(&prefix, &namespace);
        }
        prefixes
    }
}

/// One walk over the graph into a writer.
struct Pass<'p, 'a, 'w> {
    exporter: &'p Exporter<'a>,
    session: &'p mut ExportSession,
    writer: &'p mut XmlWriter<'w>,
}

impl Pass<'_, '_, '_> {
    /// Write the document element. Returns the number of root-level features.
    fn root(&mut self, graph: &FeatureGraph, root: FeatureHandle, out_of_band: &[FeatureHandle]) -> Result<usize> {
        let source = Source {
            graph,
            document_url: None,
        };
        let depth = self.exporter.config.resolve_depth;

        if graph.feature(root).is_collection() {
            return self.collection(source, root, depth, Some(out_of_band));
        }
        if out_of_band.is_empty() {
            self.feature(source, root, depth)?;
            return Ok(1);
        }

        let count = 1 + out_of_band.len();
        self.writer.open_tag(WFS_NS, "FeatureCollection")?;
        self.writer
            .attribute("", "numberOfFeatures", &count.to_string())?;
        let mut envelope = self.bounds(graph, root)?;
        for extra in out_of_band {
            envelope = merge_optional(envelope, self.bounds(graph, *extra)?.as_ref())?;
        }
        if let Some(envelope) = &envelope {
            self.bounded_by(envelope)?;
        }
        self.member(source, root, depth)?;
        self.out_of_band(source, out_of_band, depth)?;
        self.writer.close_tag()?;
        Ok(count)
    }

    /// Write a collection. `root_extras` is set for the document element
    /// and holds the out-of-band features to append.
    fn collection(
        &mut self,
        source: Source<'_>,
        handle: FeatureHandle,
        depth: Depth,
        root_extras: Option<&[FeatureHandle]>,
    ) -> Result<usize> {
        let graph = source.graph;
        let feature = graph.feature(handle);
        let extras = root_extras.unwrap_or_default();
        let id = graph.feature_id(handle);
        self.session.mark_emitted(source.key(handle), &id);

        let count = match feature.body() {
            FeatureBody::Plain => 0,
            FeatureBody::Collection { members } => members.len(),
            FeatureBody::TupleCollection { tuples, .. } => tuples.len(),
        } + extras.len();

        let name = feature.name();
        self.writer.open_tag(name.namespace(), name.local_name())?;
        if root_extras.is_none() {
            self.writer.attribute(GML_NS, "id", &id)?;
        }
        self.writer
            .attribute("", "numberOfFeatures", &count.to_string())?;
        for (key, value) in feature.attributes() {
            if key != "numberOfFeatures" {
                self.writer.attribute("", key, value)?;
            }
        }

        let mut envelope = self.bounds(graph, handle)?;
        for extra in extras {
            envelope = merge_optional(envelope, self.bounds(graph, *extra)?.as_ref())?;
        }
        if let Some(envelope) = &envelope {
            self.bounded_by(envelope)?;
        }

        match feature.body() {
            FeatureBody::Plain => {}
            FeatureBody::Collection { members } => {
                for member in members {
                    self.member(source, *member, depth)?;
                }
            }
            FeatureBody::TupleCollection { tuples, .. } => {
                for tuple in tuples {
                    self.writer.open_tag(WFS_NS, "member")?;
                    self.writer.open_tag(WFS_NS, "Tuple")?;
                    for member in tuple {
                        self.member(source, *member, depth)?;
                    }
                    self.writer.close_tag()?;
                    self.writer.close_tag()?;
                }
            }
        }
        self.out_of_band(source, extras, depth)?;

        self.writer.close_tag()?;
        Ok(count)
    }

    fn out_of_band(&mut self, source: Source<'_>, extras: &[FeatureHandle], depth: Depth) -> Result<()> {
        for extra in extras {
            if self.member(source, *extra, depth)? {
                self.session.root_out_of_band.push(*extra);
            }
        }
        Ok(())
    }

    /// Write a `wfs:member`. Returns whether the feature got content.
    fn member(&mut self, source: Source<'_>, handle: FeatureHandle, depth: Depth) -> Result<bool> {
        let id = source.graph.feature_id(handle);
        let key = source.key(handle);
        self.writer.open_tag(WFS_NS, "member")?;
        let written = if self.session.is_emitted(&key) {
            self.writer.attribute(XLINK_NS, "href", &format!("#{id}"))?;
            false
        } else if self.id_taken(source, &id, &key) {
            let href = self.local_href(source, handle, &id);
            self.writer.attribute(XLINK_NS, "href", &href)?;
            false
        } else {
            self.feature(source, handle, depth)?;
            true
        };
        self.writer.close_tag()?;
        Ok(written)
    }

    /// Whether a feature of a fetched document shares its id with another
    /// feature of the output and must stay a link.
    fn id_taken(&self, source: Source<'_>, id: &str, key: &FeatureKey) -> bool {
        source.document_url.is_some() && !self.session.may_use_id(id, key)
    }

    fn feature(&mut self, source: Source<'_>, handle: FeatureHandle, depth: Depth) -> Result<()> {
        if source.graph.feature(handle).is_collection() {
            self.collection(source, handle, depth, None).map(|_| ())
        } else {
            self.plain(source, handle, depth)
        }
    }

    fn plain(&mut self, source: Source<'_>, handle: FeatureHandle, depth: Depth) -> Result<()> {
        let graph = source.graph;
        let feature = graph.feature(handle);
        let feature_type = feature.feature_type();
        let id = graph.feature_id(handle);
        self.session.mark_emitted(source.key(handle), &id);

        if feature_type.origin() == TypeOrigin::Declared {
            check_structure(&id, feature.properties().iter().map(|p| &p.name), feature_type)?;
        }

        let name = feature.name();
        self.writer.open_tag(name.namespace(), name.local_name())?;
        self.writer.attribute(GML_NS, "id", &id)?;
        for (key, value) in feature.attributes() {
            self.writer.attribute("", key, value)?;
        }
        if let Some(envelope) = self.bounds(graph, handle)? {
            self.bounded_by(&envelope)?;
        }

        for (index, property) in feature.properties().iter().enumerate() {
            let representation = feature_type
                .property(&property.name)
                .and_then(|p| p.representation())
                .unwrap_or_default();
            self.property(source, &id, index, property, representation, depth)?;
        }

        self.writer.close_tag()
    }

    fn property(
        &mut self,
        source: Source<'_>,
        feature_id: &str,
        index: usize,
        property: &FeatureProperty,
        representation: Representation,
        depth: Depth,
    ) -> Result<()> {
        let name = &property.name;
        match &property.value {
            PropertyValue::Primitive(value) => {
                self.writer
                    .text_element(name.namespace(), name.local_name(), &value.to_string())
            }
            PropertyValue::Geometry(geometry) => {
                self.writer.open_tag(name.namespace(), name.local_name())?;
                self.exporter.adapter.serialize_geometry(
                    geometry,
                    &format!("{feature_id}.{index}"),
                    self.writer,
                )?;
                self.writer.close_tag()
            }
            PropertyValue::Feature(target) => {
                self.nested(source, name, *target, representation, depth)
            }
            PropertyValue::Unresolved(target) => Err(FeatureError::UnresolvedAccess {
                feature: feature_id.to_string(),
                property: name.to_string(),
                target: target.clone(),
            }),
            PropertyValue::External(url) => self.external(name, url, depth),
        }
    }

    fn nested(
        &mut self,
        source: Source<'_>,
        name: &QName,
        target: FeatureHandle,
        representation: Representation,
        depth: Depth,
    ) -> Result<()> {
        let target_id = source.graph.feature_id(target);
        let key = source.key(target);
        if self.session.is_emitted(&key) {
            return self.reference(name, &format!("#{target_id}"));
        }
        if self.id_taken(source, &target_id, &key) {
            let href = self.local_href(source, target, &target_id);
            return self.reference(name, &href);
        }

        match representation {
            Representation::Reference => {
                let href = self.local_href(source, target, &target_id);
                self.reference(name, &href)
            }
            Representation::Inline | Representation::Either if exhausted(depth) => {
                let exporter = self.exporter;
                let config = &exporter.config;
                let href = match &config.object_base_url {
                    Some(base) => {
                        get_object_url(base, &config.wfs_version, &config.wfs_service, &target_id)
                    }
                    None => self.local_href(source, target, &target_id),
                };
                self.reference(name, &href)
            }
            Representation::Inline | Representation::Either => {
                self.writer.open_tag(name.namespace(), name.local_name())?;
                self.feature(source, target, nested(depth))?;
                self.writer.close_tag()
            }
        }
    }

    /// `#id` for the exported graph, recorded for the out-of-band plan;
    /// `url#id` for a fetched document.
    fn local_href(&mut self, source: Source<'_>, target: FeatureHandle, id: &str) -> String {
        match source.document_url {
            None => {
                self.session.record_local(target);
                format!("#{id}")
            }
            Some(url) => format!("{url}#{id}"),
        }
    }

    fn external(&mut self, name: &QName, url: &str, depth: Depth) -> Result<()> {
        if exhausted(depth) {
            let href = self.external_object_url(url);
            return self.reference(name, &href);
        }
        if !self.session.dereference {
            return self.reference(name, url);
        }

        match self.dereference(url) {
            Ok((document, handle, document_url)) => {
                let source = Source {
                    graph: &document.graph,
                    document_url: Some(&document_url),
                };
                let id = document.graph.feature_id(handle);
                let key = source.key(handle);
                if self.session.is_emitted(&key) {
                    return self.reference(name, &format!("#{id}"));
                }
                // Another feature of the output already goes by this id
                if !self.session.may_use_id(&id, &key) {
                    return self.reference(name, url);
                }
                self.writer.open_tag(name.namespace(), name.local_name())?;
                self.feature(source, handle, nested(depth))?;
                self.writer.close_tag()
            }
            Err(error) => {
                tracing::warn!(url, error = %error, "failed to dereference external reference");
                self.session.reference_errors.push(error);
                self.reference(name, url)
            }
        }
    }

    /// GetObject URL for the fragment id of an external reference, or the
    /// reference itself when no base URL is configured.
    fn external_object_url(&self, url: &str) -> String {
        let config = &self.exporter.config;
        let fragment = Url::parse(url)
            .ok()
            .and_then(|u| u.fragment().map(str::to_string));
        match (&config.object_base_url, fragment) {
            (Some(base), Some(id)) => {
                get_object_url(base, &config.wfs_version, &config.wfs_service, &id)
            }
            _ => url.to_string(),
        }
    }

    /// Fetch, parse and resolve the document behind `url`.
    ///
    /// Returns the document, the referenced feature (the fragment id, else
    /// the document element) and the document URL.
    fn dereference(&mut self, url: &str) -> Result<(Rc<ParsedDocument>, FeatureHandle, String)> {
        let reference_error = |message: String| FeatureError::Reference {
            url: url.to_string(),
            message,
        };

        let mut location = Url::parse(url).map_err(|e| reference_error(e.to_string()))?;
        let fragment = location.fragment().map(str::to_string);
        location.set_fragment(None);
        let document_url = location.to_string();

        let document = match self.session.document(&document_url) {
            Some(document) => document,
            None => {
                let resolver = self
                    .exporter
                    .resolver
                    .ok_or_else(|| reference_error("no resolver configured".to_string()))?;
                let text = resolver
                    .fetch(&document_url)
                    .map_err(|e| reference_error(e.to_string()))?;
                let parser = DocumentParser::new(self.exporter.lookup, self.exporter.adapter)
                    .with_options(ParserOptions::new().with_base_url(location));
                let mut document = parser
                    .parse_str(&text)
                    .map_err(|e| reference_error(e.to_string()))?;
                document
                    .resolve()
                    .map_err(|e| reference_error(e.to_string()))?;
                tracing::debug!(url = %document_url, features = document.graph.len(), "fetched external document");

                let document = Rc::new(document);
                self.session
                    .store_document(document_url.clone(), Rc::clone(&document));
                document
            }
        };

        let handle = match fragment {
            Some(id) => document
                .lookup(&id)
                .ok_or_else(|| reference_error(format!("no feature with id '{id}'")))?,
            None => document.root,
        };
        Ok((document, handle, document_url))
    }

    fn reference(&mut self, name: &QName, href: &str) -> Result<()> {
        self.writer.open_tag(name.namespace(), name.local_name())?;
        self.writer.attribute(XLINK_NS, "href", href)?;
        self.writer.close_tag()
    }

    fn bounds(&self, graph: &FeatureGraph, handle: FeatureHandle) -> Result<Option<Envelope>> {
        EnvelopeCalculator::new(self.exporter.adapter).bounds(graph, handle)
    }

    /// Write `gml:boundedBy` with corners in the CRS's axis order.
    fn bounded_by(&mut self, envelope: &Envelope) -> Result<()> {
        let axis = AxisOrder::for_srs_name(envelope.srs_name.as_deref());
        let lower = axis.apply(envelope.min);
        let upper = axis.apply(envelope.max);

        self.writer.open_tag(GML_NS, "boundedBy")?;
        self.writer.open_tag(GML_NS, "Envelope")?;
        if let Some(srs_name) = &envelope.srs_name {
            self.writer.attribute("", "srsName", srs_name)?;
        }
        self.writer.attribute("", "srsDimension", "2")?;
        self.writer
            .text_element(GML_NS, "lowerCorner", &format!("{} {}", lower.x, lower.y))?;
        self.writer
            .text_element(GML_NS, "upperCorner", &format!("{} {}", upper.x, upper.y))?;
        self.writer.close_tag()?;
        self.writer.close_tag()
    }
}
