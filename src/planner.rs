//! Request planning: grouping, batching and demultiplexing.
//!
//! The planner turns a flat list of tags into one or more physical requests
//! that each fit the negotiated PDU and the item limit, and maps the decoded
//! responses back to the caller's order.
//!
//! # Grouping
//!
//! With grouping enabled, tags are stably sorted by area, block and start
//! offset. Consecutive tags of the same area and block are merged into one
//! byte-range item when the filler bytes between them are cheaper than the
//! [`ITEM_OVERHEAD`] a separate item would cost, and the merged range still
//! fits one item. A single tag keeps its own item and data type.
//!
//! A failing status on a merged item fails every tag it covers. Callers that
//! need per-tag fault isolation should plan without grouping.
//!
//! # Batching
//!
//! Items are added to the current batch while the request and the expected
//! response stay below the PDU size and the batch holds fewer than
//! `max_items` items. Writes are never merged; each tag is one item.
//!
//! # Example
//!
//! ```
//! use s7_tags::{plan_read, PlannerConfig, Tag};
//!
//! let tags: Vec<Tag> = vec!["DB1,X2.5".parse()?, "DB1,X1.7".parse()?, "MW0".parse()?];
//! let plan = plan_read(&tags, &PlannerConfig::new(240), true)?;
//!
//! assert_eq!(plan.batches().len(), 1);
//! let items = plan.batches()[0].items();
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].tag().to_string(), "DB1,B1*2");
//! # Ok::<(), s7_tags::S7Error>(())
//! ```

use std::mem::take;

use crate::command::{
    max_read_item_size, max_write_item_size, ReadRequest, WriteItem, WriteRequest,
    DATA_ITEM_HEADER_SIZE, ITEM_SPEC_SIZE, MAX_ITEMS, WRITE_STATUS_SIZE,
};
use crate::error::{Result, S7Error};
use crate::header::{REQUEST_OVERHEAD, RESPONSE_OVERHEAD};
use crate::response::{ReadResult, S7Response, WriteResult};
use crate::tag::{DataType, Tag};
use crate::utils::get_bit;
use crate::value::Value;

/// Bytes one extra read item costs: its item specification in the request
/// plus its item header in the response.
pub const ITEM_OVERHEAD: usize = ITEM_SPEC_SIZE + DATA_ITEM_HEADER_SIZE;

/// Returns whether reading `gap` filler bytes is cheaper than a separate item.
///
/// `gap` is the distance from the end of the current range to the start of
/// the next tag; zero or negative gaps (adjacent or overlapping tags) always
/// qualify.
///
/// # Example
///
/// ```
/// use s7_tags::merge_is_beneficial;
///
/// assert!(merge_is_beneficial(-4));
/// assert!(merge_is_beneficial(15));
/// assert!(!merge_is_beneficial(16));
/// ```
pub fn merge_is_beneficial(gap: i64) -> bool {
    let wasted = gap.max(0) as usize;
    wasted < ITEM_OVERHEAD
}

/// Planning limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Negotiated PDU size.
    pub pdu_size: u16,
    /// Maximum number of items per request. Planning clamps it to 1..=[`MAX_ITEMS`].
    pub max_items: usize,
}

impl PlannerConfig {
    /// Creates a config allowing [`MAX_ITEMS`] items per request.
    pub fn new(pdu_size: u16) -> Self {
        Self {
            pdu_size,
            max_items: MAX_ITEMS,
        }
    }

    /// Sets the maximum number of items per request, clamped to 1..=[`MAX_ITEMS`].
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.clamp(1, MAX_ITEMS);
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(240)
    }
}

/// One physical read item and the requested tags it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadItem {
    tag: Tag,
    members: Vec<(usize, Tag)>,
}

impl ReadItem {
    fn single(index: usize, tag: Tag) -> Self {
        Self {
            tag,
            members: vec![(index, tag)],
        }
    }

    /// Returns the tag put on the wire.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Returns the requested tags carried by this item with their original indices.
    pub fn members(&self) -> &[(usize, Tag)] {
        &self.members
    }

    /// Returns whether this item is a merged byte range.
    pub fn is_packed(&self) -> bool {
        self.members.len() > 1 || self.members.first().map(|(_, tag)| tag) != Some(&self.tag)
    }

    /// Decodes the value of `member` from this item's payload.
    fn extract(&self, member: &Tag, data: &[u8]) -> Result<Value> {
        if self.tag.data_type() == DataType::Bit {
            return Value::decode(DataType::Bit, 1, data);
        }

        let offset = (member.start() - self.tag.start()) as usize;
        let bytes = data.get(offset..).ok_or_else(|| {
            S7Error::protocol(format!("{member} lies outside the payload of {}", self.tag))
        })?;
        if member.data_type() == DataType::Bit {
            let byte = bytes.first().copied().ok_or_else(|| {
                S7Error::protocol(format!("{member} lies outside the payload of {}", self.tag))
            })?;
            return Ok(Value::Bool(get_bit(byte, member.bit_offset())));
        }
        Value::decode(member.data_type(), member.length(), bytes)
    }
}

/// Merged byte range being built during grouping.
struct Group {
    start: u32,
    end: usize,
    members: Vec<(usize, Tag)>,
}

impl Group {
    fn new(index: usize, tag: Tag) -> Self {
        Self {
            start: tag.start(),
            end: tag.end(),
            members: vec![(index, tag)],
        }
    }

    fn first(&self) -> &Tag {
        &self.members[0].1
    }

    fn accepts(&self, tag: &Tag, max_size: usize) -> bool {
        if !self.first().same_region(tag) {
            return false;
        }
        let gap = tag.start() as i64 - self.end as i64;
        let span = self.end.max(tag.end()) - self.start as usize;
        merge_is_beneficial(gap) && span <= max_size
    }

    fn push(&mut self, index: usize, tag: Tag) {
        self.end = self.end.max(tag.end());
        self.members.push((index, tag));
    }

    fn finish(self) -> Result<ReadItem> {
        if self.members.len() == 1 {
            let (index, tag) = self.members[0];
            return Ok(ReadItem::single(index, tag));
        }
        let first = *self.first();
        let tag = Tag::byte_range(
            first.area(),
            first.db_number(),
            self.start,
            self.end - self.start as usize,
        )?;
        Ok(ReadItem {
            tag,
            members: self.members,
        })
    }
}

fn group(tags: &[Tag], max_size: usize) -> Result<Vec<ReadItem>> {
    let mut sorted: Vec<(usize, Tag)> = tags.iter().copied().enumerate().collect();
    sorted.sort_by_key(|(_, tag)| tag.sort_key());

    let mut items = Vec::new();
    let mut current: Option<Group> = None;
    for (index, tag) in sorted {
        if let Some(group) = current.as_mut() {
            if group.accepts(&tag, max_size) {
                group.push(index, tag);
                continue;
            }
        }
        if let Some(group) = current.replace(Group::new(index, tag)) {
            items.push(group.finish()?);
        }
    }
    if let Some(group) = current {
        items.push(group.finish()?);
    }
    Ok(items)
}

/// Puts `index, value` pairs into index order and drops the indices.
pub(crate) fn in_request_order<T>(mut indexed: Vec<(usize, T)>) -> Vec<T> {
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, value)| value).collect()
}

fn check_response_count(batches: usize, responses: usize) -> Result<()> {
    if batches != responses {
        return Err(S7Error::protocol(format!(
            "plan has {batches} batches but {responses} responses were given"
        )));
    }
    Ok(())
}

/// Items sent in one read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBatch {
    items: Vec<ReadItem>,
}

impl ReadBatch {
    /// Returns the items in wire order.
    pub fn items(&self) -> &[ReadItem] {
        &self.items
    }

    /// Returns the wire tags in order.
    pub fn tags(&self) -> Vec<Tag> {
        self.items.iter().map(|item| item.tag).collect()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the read request for this batch.
    pub fn to_request(&self, pdu_ref: u16, pdu_size: u16) -> Result<ReadRequest> {
        ReadRequest::new(self.tags(), pdu_ref, pdu_size)
    }

    /// Decodes the response to this batch, failing on the first failed item.
    ///
    /// Returns `(original index, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Rejected` for a header error, `S7Error::ReadResponse`
    /// naming the failed wire item, or `S7Error::Protocol` for malformed data.
    pub fn decode(&self, response: &S7Response) -> Result<Vec<(usize, Value)>> {
        response.check_error()?;
        let payloads = response.read_items(&self.tags())?;

        let mut values = Vec::new();
        for (item, payload) in self.items.iter().zip(payloads) {
            if !payload.return_code.is_success() {
                return Err(S7Error::ReadResponse {
                    tag: item.tag,
                    code: payload.return_code,
                });
            }
            for (index, member) in &item.members {
                values.push((*index, item.extract(member, payload.data)?));
            }
        }
        Ok(values)
    }

    /// Decodes the response to this batch, recording failed items per tag.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Rejected` or `S7Error::Protocol`; item failures are
    /// reported in the returned records.
    pub fn decode_detailed(&self, response: &S7Response) -> Result<Vec<(usize, ReadResult)>> {
        response.check_error()?;
        let payloads = response.read_items(&self.tags())?;

        let mut results = Vec::new();
        for (item, payload) in self.items.iter().zip(payloads) {
            for (index, member) in &item.members {
                let result = if payload.return_code.is_success() {
                    ReadResult::ok(*member, item.extract(member, payload.data)?)
                } else {
                    ReadResult::failed(*member, payload.return_code)
                };
                results.push((*index, result));
            }
        }
        Ok(results)
    }
}

/// Batches for one read call and the map back to the caller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    batches: Vec<ReadBatch>,
    tag_count: usize,
}

impl ReadPlan {
    /// Returns the batches in send order.
    pub fn batches(&self) -> &[ReadBatch] {
        &self.batches
    }

    /// Returns the number of requested tags.
    pub fn tag_count(&self) -> usize {
        self.tag_count
    }

    /// Returns the number of physical items across all batches.
    pub fn item_count(&self) -> usize {
        self.batches.iter().map(ReadBatch::len).sum()
    }

    /// Decodes one response per batch into values in request order.
    ///
    /// # Errors
    ///
    /// Returns the first error of any batch, or `S7Error::Protocol` if the
    /// number of responses differs from the number of batches.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_tags::{plan_read, PlannerConfig, S7Response, Tag, Value};
    ///
    /// let tags: Vec<Tag> = vec!["DB1,X0.0".parse()?, "DB1,X0.7".parse()?];
    /// let plan = plan_read(&tags, &PlannerConfig::new(240), true)?;
    ///
    /// // DB1.B0 = 0b1000_0000
    /// let frame = [
    ///     0x03, 0x00, 0x00, 0x1A, 0x02, 0xF0, 0x80,
    ///     0x32, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x05, 0x00, 0x00,
    ///     0x04, 0x01,
    ///     0xFF, 0x04, 0x00, 0x08, 0x80,
    /// ];
    /// let response = S7Response::from_bytes(&frame)?;
    /// let values = plan.decode(&[response])?;
    /// assert_eq!(values, vec![Value::Bool(false), Value::Bool(true)]);
    /// # Ok::<(), s7_tags::S7Error>(())
    /// ```
    pub fn decode(&self, responses: &[S7Response]) -> Result<Vec<Value>> {
        check_response_count(self.batches.len(), responses.len())?;
        let mut values = Vec::with_capacity(self.tag_count);
        for (batch, response) in self.batches.iter().zip(responses) {
            values.extend(batch.decode(response)?);
        }
        Ok(in_request_order(values))
    }

    /// Decodes one response per batch into per-tag results in request order.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::Rejected` or `S7Error::Protocol`; item failures are
    /// reported in the returned records.
    pub fn decode_detailed(&self, responses: &[S7Response]) -> Result<Vec<ReadResult>> {
        check_response_count(self.batches.len(), responses.len())?;
        let mut results = Vec::with_capacity(self.tag_count);
        for (batch, response) in self.batches.iter().zip(responses) {
            results.extend(batch.decode_detailed(response)?);
        }
        Ok(in_request_order(results))
    }
}

/// Plans a read of `tags`.
///
/// With `optimize` set, nearby tags of the same area and block are merged
/// into byte-range items; otherwise every tag is its own item.
///
/// # Errors
///
/// Returns `S7Error::ItemTooLarge` if any tag cannot fit the PDU on its own.
///
/// # Example
///
/// ```
/// use s7_tags::{plan_read, PlannerConfig, Tag};
///
/// let tags: Vec<Tag> = (0..30).map(|i| format!("DB1,W{}", i * 40).parse().unwrap()).collect();
/// let plan = plan_read(&tags, &PlannerConfig::new(240), false)?;
/// assert_eq!(plan.item_count(), 30);
/// assert!(plan.batches().len() >= 2);
/// # Ok::<(), s7_tags::S7Error>(())
/// ```
pub fn plan_read(tags: &[Tag], config: &PlannerConfig, optimize: bool) -> Result<ReadPlan> {
    let max = max_read_item_size(config.pdu_size);
    if let Some(tag) = tags.iter().find(|tag| tag.size() > max) {
        return Err(S7Error::ItemTooLarge {
            tag: *tag,
            required: tag.size(),
            max,
            pdu_size: config.pdu_size,
        });
    }

    let items = if optimize {
        group(tags, max)?
    } else {
        tags.iter()
            .enumerate()
            .map(|(index, tag)| ReadItem::single(index, *tag))
            .collect()
    };

    let pdu_size = config.pdu_size as usize;
    let max_items = config.max_items.clamp(1, MAX_ITEMS);
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut request_len = REQUEST_OVERHEAD;
    let mut response_len = RESPONSE_OVERHEAD;

    for item in items {
        let size = item.tag.size();
        let item_response = DATA_ITEM_HEADER_SIZE + size + (size & 1);
        let fits = request_len + ITEM_SPEC_SIZE < pdu_size
            && response_len + item_response < pdu_size
            && current.len() < max_items;
        if !fits && !current.is_empty() {
            batches.push(ReadBatch {
                items: take(&mut current),
            });
            request_len = REQUEST_OVERHEAD;
            response_len = RESPONSE_OVERHEAD;
        }
        request_len += ITEM_SPEC_SIZE;
        response_len += item_response;
        current.push(item);
    }
    if !current.is_empty() {
        batches.push(ReadBatch { items: current });
    }

    Ok(ReadPlan {
        batches,
        tag_count: tags.len(),
    })
}

/// Items sent in one write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    items: Vec<WriteItem>,
}

impl WriteBatch {
    /// Returns the items in wire order.
    pub fn items(&self) -> &[WriteItem] {
        &self.items
    }

    /// Returns the target tags in order.
    pub fn tags(&self) -> Vec<Tag> {
        self.items.iter().map(|item| *item.tag()).collect()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns whether the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the write request for this batch.
    pub fn to_request(&self, pdu_ref: u16, pdu_size: u16) -> Result<WriteRequest> {
        WriteRequest::new(self.items.clone(), pdu_ref, pdu_size)
    }

    /// Decodes the response to this batch into one result per tag.
    pub fn decode(&self, response: &S7Response) -> Result<Vec<WriteResult>> {
        response.check_error()?;
        response.to_write_results(&self.tags())
    }

    /// Validates every item of this batch was written.
    pub fn check(&self, response: &S7Response) -> Result<()> {
        response.check_error()?;
        response.check_write(&self.tags())
    }
}

/// Batches for one write call, in the caller's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    batches: Vec<WriteBatch>,
}

impl WritePlan {
    /// Returns the batches in send order.
    pub fn batches(&self) -> &[WriteBatch] {
        &self.batches
    }

    /// Returns the number of tags written.
    pub fn tag_count(&self) -> usize {
        self.batches.iter().map(WriteBatch::len).sum()
    }

    /// Decodes one response per batch into per-tag results in request order.
    pub fn decode(&self, responses: &[S7Response]) -> Result<Vec<WriteResult>> {
        check_response_count(self.batches.len(), responses.len())?;
        let mut results = Vec::with_capacity(self.tag_count());
        for (batch, response) in self.batches.iter().zip(responses) {
            results.extend(batch.decode(response)?);
        }
        Ok(results)
    }

    /// Validates every tag was written.
    ///
    /// # Errors
    ///
    /// Returns `S7Error::WriteResponse` naming the first failed tag.
    pub fn check(&self, responses: &[S7Response]) -> Result<()> {
        check_response_count(self.batches.len(), responses.len())?;
        self.batches
            .iter()
            .zip(responses)
            .try_for_each(|(batch, response)| batch.check(response))
    }
}

/// Plans a write of `values` to `tags`, one item per tag.
///
/// Values are encoded and validated here, before anything is sent.
///
/// # Errors
///
/// Returns an error if:
/// - the counts differ (`ValueCountMismatch`)
/// - a value does not match its tag (`InvalidValue`)
/// - a tag cannot fit the PDU on its own (`ItemTooLarge`)
///
/// # Example
///
/// ```
/// use s7_tags::{plan_write, PlannerConfig, Tag, Value};
///
/// let tags: Vec<Tag> = vec!["DB1,W0".parse()?, "DB1,X2.1".parse()?];
/// let values = vec![Value::Word(7), Value::Bool(true)];
/// let plan = plan_write(&tags, &values, &PlannerConfig::new(240))?;
/// assert_eq!(plan.batches().len(), 1);
/// assert_eq!(plan.tag_count(), 2);
/// # Ok::<(), s7_tags::S7Error>(())
/// ```
pub fn plan_write(tags: &[Tag], values: &[Value], config: &PlannerConfig) -> Result<WritePlan> {
    if tags.len() != values.len() {
        return Err(S7Error::ValueCountMismatch {
            tags: tags.len(),
            values: values.len(),
        });
    }

    let max = max_write_item_size(config.pdu_size);
    let items = tags
        .iter()
        .zip(values)
        .map(|(tag, value)| {
            if tag.size() > max {
                return Err(S7Error::ItemTooLarge {
                    tag: *tag,
                    required: tag.size(),
                    max,
                    pdu_size: config.pdu_size,
                });
            }
            WriteItem::new(*tag, value)
        })
        .collect::<Result<Vec<_>>>()?;

    let pdu_size = config.pdu_size as usize;
    let max_items = config.max_items.clamp(1, MAX_ITEMS);
    let mut batches = Vec::new();
    let mut current = Vec::new();
    let mut request_len = REQUEST_OVERHEAD;
    let mut response_len = RESPONSE_OVERHEAD;

    for item in items {
        let size = item.data().len();
        let item_request = ITEM_SPEC_SIZE + DATA_ITEM_HEADER_SIZE + size + (size & 1);
        let fits = request_len + item_request < pdu_size
            && response_len + WRITE_STATUS_SIZE < pdu_size
            && current.len() < max_items;
        if !fits && !current.is_empty() {
            batches.push(WriteBatch {
                items: take(&mut current),
            });
            request_len = REQUEST_OVERHEAD;
            response_len = RESPONSE_OVERHEAD;
        }
        request_len += item_request;
        response_len += WRITE_STATUS_SIZE;
        current.push(item);
    }
    if !current.is_empty() {
        batches.push(WriteBatch { items: current });
    }

    Ok(WritePlan { batches })
}
