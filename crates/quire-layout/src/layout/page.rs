//! [CSS Paged Media Module Level 3](https://www.w3.org/TR/css-page-3/)
//!
//! The page orchestrator: lays the root box out one page at a time,
//! carrying the resume state, deferred footnotes and broken floats from
//! one page to the next.

use std::mem;
use std::rc::Rc;

use log::{debug, info};
use quire_common::warning::warn_once;
use serde::{Deserialize, Serialize};

use super::block::{NextPage, block_level_layout, start_page_name};
use super::box_model::{AutoOr, EdgeSizes, Rect};
use super::boxes::{BoxId, BoxKind, LayoutBox};
use super::context::{BrokenOutOfFlow, FootnoteArea, LayoutContext};
use super::float::float_layout;
use super::positioned::absolute_layout;
use super::skip_stack::SkipStack;
use super::text::TextShaper;
use crate::Error;
use crate::style::{BreakValue, ComputedStyle, Direction, Display};

/// 96 dpi CSS pixels per millimetre.
const PX_PER_MM: f32 = 96.0 / 25.4;

/// [§ 3.3 Page progression](https://www.w3.org/TR/css-page-3/#progression)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSide {
    /// A verso page in left-to-right progression.
    Left,
    /// A recto page in left-to-right progression.
    #[default]
    Right,
}

impl PageSide {
    const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Page box geometry.
///
/// [§ 3.2 Page Size](https://www.w3.org/TR/css-page-3/#page-size)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PageSetup {
    /// Page box width in pixels.
    pub width: f32,
    /// Page box height in pixels.
    pub height: f32,
    /// Page margins.
    pub margin: EdgeSizes,
    /// Side of the first page.
    pub first_page_side: PageSide,
}

impl Default for PageSetup {
    /// A4 at 96 dpi with 75px margins.
    fn default() -> Self {
        Self {
            width: 210.0 * PX_PER_MM,
            height: 297.0 * PX_PER_MM,
            margin: EdgeSizes {
                top: 75.0,
                right: 75.0,
                bottom: 75.0,
                left: 75.0,
            },
            first_page_side: PageSide::Right,
        }
    }
}

impl PageSetup {
    /// The page area: the page box minus the margins.
    #[must_use]
    pub fn content_area(&self) -> Rect {
        Rect {
            x: self.margin.left,
            y: self.margin.top,
            width: self.width - self.margin.horizontal(),
            height: self.height - self.margin.vertical(),
        }
    }

    /// Side of the 1-based page `number`.
    #[must_use]
    pub const fn side_of(&self, number: usize) -> PageSide {
        if number % 2 == 1 {
            self.first_page_side
        } else {
            self.first_page_side.opposite()
        }
    }

    /// Check that the page area is not empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPageSetup`] for non-finite sizes or margins
    /// leaving no room for content.
    pub fn validate(&self) -> Result<(), Error> {
        let area = self.content_area();
        let values = [
            self.width,
            self.height,
            self.margin.top,
            self.margin.right,
            self.margin.bottom,
            self.margin.left,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(Error::InvalidPageSetup("sizes must be finite".to_string()));
        }
        if area.width <= 0.0 || area.height <= 0.0 {
            return Err(Error::InvalidPageSetup(format!(
                "margins leave a {}x{} page area on a {}x{} page",
                area.width, area.height, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Everything that drives [`layout_document`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayoutOptions {
    /// Page geometry.
    pub page: PageSetup,
    /// Stop after this many pages.
    pub max_pages: Option<usize>,
}

/// One laid out page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Name given by the 'page' property of its first box.
    pub name: Option<String>,
    /// Left or right page.
    pub side: PageSide,
    /// Page box width.
    pub width: f32,
    /// Page box height.
    pub height: f32,
    /// The page area.
    pub content_area: Rect,
    /// The fragment of the root box on this page, `None` on blank pages.
    pub content: Option<LayoutBox>,
    /// Footnotes at the bottom of the page area, top to bottom.
    pub footnotes: Vec<LayoutBox>,
    /// Fixed boxes of `content`, positioned against the page area.
    pub fixed: Vec<BoxId>,
    /// Blank page inserted to honor a left or right break.
    pub blank: bool,
}

impl Page {
    /// Serializable view of the page.
    #[must_use]
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            number: self.number,
            name: self.name.clone(),
            side: self.side,
            width: self.width,
            height: self.height,
            blank: self.blank,
            content: self.content.as_ref().map(FragmentSummary::of),
            footnotes: self.footnotes.iter().map(FragmentSummary::of).collect(),
        }
    }
}

/// A [`Page`] reduced to geometry, for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    /// 1-based page number.
    pub number: usize,
    /// Page name.
    pub name: Option<String>,
    /// Left or right page.
    pub side: PageSide,
    /// Page box width.
    pub width: f32,
    /// Page box height.
    pub height: f32,
    /// Blank page.
    pub blank: bool,
    /// Root fragment.
    pub content: Option<FragmentSummary>,
    /// Footnotes.
    pub footnotes: Vec<FragmentSummary>,
}

/// A positioned box reduced to its border box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentSummary {
    /// Kind and tag, as in [`LayoutBox::label`].
    pub label: String,
    /// Border box.
    pub border_box: Rect,
    /// Text of text boxes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Child fragments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl FragmentSummary {
    /// Summary of `layout_box` and its descendants.
    #[must_use]
    pub fn of(layout_box: &LayoutBox) -> Self {
        Self {
            label: layout_box.label(),
            border_box: layout_box.border_box(),
            text: layout_box.text_content().map(str::to_string),
            children: layout_box.children.iter().map(Self::of).collect(),
        }
    }
}

/// Lay `root` out into pages.
///
/// Pages are produced lazily; the iterator ends once the root box, the
/// deferred footnotes and the broken floats are all placed.
///
/// # Errors
///
/// Returns [`Error::InvalidPageSetup`] when the page area is empty.
pub fn layout_document<'a>(
    root: LayoutBox,
    shaper: &'a dyn TextShaper,
    options: LayoutOptions,
) -> Result<Pages<'a>, Error> {
    options.page.validate()?;
    let area = options.page.content_area();
    let mut ctx = LayoutContext::new(shaper, area.bottom());
    ctx.root_id = Some(root.id);
    ctx.footnote_width = area.width;
    Ok(Pages {
        root,
        options,
        ctx,
        resume_at: None,
        next_page: NextPage::default(),
        number: 0,
        root_done: false,
        done: false,
    })
}

/// Lazy sequence of [`Page`]s, see [`layout_document`].
pub struct Pages<'a> {
    root: LayoutBox,
    options: LayoutOptions,
    ctx: LayoutContext<'a>,
    resume_at: Option<SkipStack>,
    next_page: NextPage,
    number: usize,
    /// The root box is completely laid out; only deferred content remains.
    root_done: bool,
    done: bool,
}

impl Pages<'_> {
    /// The side the next page has to be on, after a left/right break.
    fn required_side(&self) -> Option<PageSide> {
        let recto = match self.root.style.direction {
            Direction::Ltr => PageSide::Right,
            Direction::Rtl => PageSide::Left,
        };
        match self.next_page.break_value {
            BreakValue::Left => Some(PageSide::Left),
            BreakValue::Right => Some(PageSide::Right),
            BreakValue::Recto => Some(recto),
            BreakValue::Verso => Some(recto.opposite()),
            _ => None,
        }
    }

    fn page(&self, number: usize, name: Option<String>) -> Page {
        let setup = &self.options.page;
        Page {
            number,
            name,
            side: setup.side_of(number),
            width: setup.width,
            height: setup.height,
            content_area: setup.content_area(),
            content: None,
            footnotes: Vec::new(),
            fixed: Vec::new(),
            blank: false,
        }
    }

    /// The anonymous block standing for the page area, containing block
    /// of the root box.
    fn page_box(&self) -> LayoutBox {
        let area = self.options.page.content_area();
        let style = ComputedStyle::anonymous_from(&self.root.style, Display::Block);
        let mut page_box = LayoutBox::new(BoxKind::BlockContainer, Rc::new(style), Vec::new());
        page_box.position_x = area.x;
        page_box.position_y = area.y;
        page_box.width = AutoOr::Length(area.width);
        page_box.height = AutoOr::Length(area.height);
        page_box
    }

    /// Reset the per-page state and report the footnotes deferred by the
    /// previous page, as many as fit.
    fn start_page(&mut self, number: usize) {
        let area = self.options.page.content_area();
        let ctx = &mut self.ctx;
        ctx.current_page = number;
        ctx.forced_break = number > 1 && self.next_page.break_value != BreakValue::Auto;
        ctx.truncate_excluded_shapes(0);
        ctx.absolute_boxes.clear();
        ctx.fixed_boxes.clear();
        ctx.footnote_area = FootnoteArea::default();

        let mut deferring = false;
        for footnote in mem::take(&mut ctx.overflowed_footnotes) {
            let fits = ctx.footnote_area.height + footnote.margin_height() <= area.height;
            if !deferring && (ctx.footnote_area.footnotes.is_empty() || fits) {
                ctx.report_footnote(footnote);
            } else {
                deferring = true;
                ctx.overflowed_footnotes.push(footnote);
            }
        }
    }

    /// Continue the floats that broke at the bottom of the previous page.
    fn broken_floats(&mut self, page_box: &LayoutBox) -> Vec<LayoutBox> {
        let area = self.options.page.content_area();
        let mut placed = Vec::new();
        for broken in mem::take(&mut self.ctx.broken_out_of_flow) {
            let (new_float, resume_at) = float_layout(
                &mut self.ctx,
                &broken.original,
                (broken.position_x, area.y),
                page_box,
                0.0,
                Some(&broken.resume_at),
            );
            if let Some(resume_at) = resume_at {
                self.ctx.broken_out_of_flow.push(BrokenOutOfFlow {
                    original: broken.original,
                    resume_at,
                    position_x: new_float.position_x,
                });
            }
            placed.push(new_float);
        }
        placed
    }

    /// Lay the remaining root content out on the page, `None` once the
    /// root is finished.
    fn root_fragment(&mut self, page_box: &LayoutBox, page_is_empty: bool) -> Option<LayoutBox> {
        if self.root_done {
            return None;
        }
        let area = self.options.page.content_area();
        let resume_at = self.resume_at.take();
        let mut layout = block_level_layout(
            &mut self.ctx,
            &self.root,
            (area.x, area.y),
            0.0,
            resume_at.as_ref(),
            page_box,
            page_is_empty,
            Vec::new(),
            false,
        );
        if layout.new_box.is_none() {
            debug!(
                "root does not fit after carried floats, forcing it on page {}",
                self.number
            );
            layout = block_level_layout(
                &mut self.ctx,
                &self.root,
                (area.x, area.y),
                0.0,
                resume_at.as_ref(),
                page_box,
                true,
                Vec::new(),
                false,
            );
        }
        self.resume_at = layout.resume_at;
        self.next_page = layout.next_page;
        self.root_done = self.resume_at.is_none();
        layout.new_box
    }

    /// Position the absolute boxes left for the initial containing block
    /// and the fixed boxes against the page area.
    fn positioned_boxes(&mut self, content: &mut LayoutBox) -> Vec<BoxId> {
        let area = self.options.page.content_area();
        let absolute = mem::take(&mut self.ctx.absolute_boxes);
        let fixed = mem::take(&mut self.ctx.fixed_boxes);
        for &id in absolute.iter().chain(&fixed) {
            if let Some(placeholder) = content.find_mut(id) {
                let laid_out = absolute_layout(&mut self.ctx, placeholder, area);
                *placeholder = laid_out;
            }
        }
        fixed
    }

    /// Stack the footnotes of the page at the bottom of the page area.
    fn footnotes(&mut self) -> Vec<LayoutBox> {
        let area = self.options.page.content_area();
        let area_box = mem::take(&mut self.ctx.footnote_area);
        let mut position_y = area.bottom() - area_box.height;
        area_box
            .footnotes
            .into_iter()
            .map(|mut footnote| {
                footnote.translate(
                    area.x - footnote.position_x,
                    position_y - footnote.position_y,
                );
                position_y += footnote.margin_height();
                footnote
            })
            .collect()
    }
}

impl Iterator for Pages<'_> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.done {
            return None;
        }
        if let Some(max_pages) = self.options.max_pages
            && self.number >= max_pages
        {
            warn_once("page", &format!("stopped after {max_pages} pages"));
            self.done = true;
            return None;
        }
        self.number += 1;
        let number = self.number;
        let name = if number == 1 {
            start_page_name(&self.root).map(str::to_string)
        } else {
            self.next_page.page.clone()
        };

        // [§ 3.4 Forced breaks](https://www.w3.org/TR/css-break-3/#forced-breaks)
        //
        // "left: Force one or two page breaks [...] so that the next page
        // is formatted as a left page."
        if number > 1
            && let Some(side) = self.required_side()
            && self.options.page.side_of(number) != side
        {
            debug!("blank page {number} before a {side:?} page");
            let mut blank = self.page(number, name);
            blank.blank = true;
            return Some(blank);
        }

        self.start_page(number);
        let page_box = self.page_box();
        let carried = self.broken_floats(&page_box);
        let page_is_empty = carried.is_empty();
        let fragment = self.root_fragment(&page_box, page_is_empty);

        let mut page = self.page(number, name);
        let mut content = match fragment {
            Some(mut fragment) => {
                let mut children = carried;
                children.append(&mut fragment.children);
                fragment.children = children;
                Some(fragment)
            }
            None if carried.is_empty() => None,
            None => Some(page_box.copy_with_children(carried)),
        };
        if let Some(content) = &mut content {
            page.fixed = self.positioned_boxes(content);
        }
        page.content = content;
        page.footnotes = self.footnotes();

        self.done = self.root_done
            && self.ctx.overflowed_footnotes.is_empty()
            && self.ctx.broken_out_of_flow.is_empty();
        let name = page
            .name
            .as_deref()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default();
        info!(
            "page {number}{name}: {} footnotes{}",
            page.footnotes.len(),
            if self.done { ", last page" } else { "" }
        );
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_setup_is_a4_with_75px_margins() {
        let setup = PageSetup::default();
        assert!((setup.width - 793.7).abs() < 0.1);
        assert!((setup.height - 1122.5).abs() < 0.1);
        let area = setup.content_area();
        assert_eq!(area.x, 75.0);
        assert!((area.width - 643.7).abs() < 0.1);
    }

    #[test]
    fn test_page_sides_alternate_from_the_first() {
        let mut setup = PageSetup::default();
        assert_eq!(setup.side_of(1), PageSide::Right);
        assert_eq!(setup.side_of(2), PageSide::Left);
        setup.first_page_side = PageSide::Left;
        assert_eq!(setup.side_of(1), PageSide::Left);
        assert_eq!(setup.side_of(4), PageSide::Right);
    }

    #[test]
    fn test_margins_larger_than_the_page_are_rejected() {
        let setup = PageSetup {
            width: 100.0,
            height: 100.0,
            margin: EdgeSizes {
                top: 60.0,
                right: 10.0,
                bottom: 60.0,
                left: 10.0,
            },
            first_page_side: PageSide::Right,
        };
        assert!(matches!(setup.validate(), Err(Error::InvalidPageSetup(_))));
        assert!(PageSetup::default().validate().is_ok());
    }

    #[test]
    fn test_setup_reads_kebab_case_json() {
        let json = r#"{
            "page": {"width": 400, "height": 300, "first-page-side": "left"},
            "max-pages": 3
        }"#;
        let options: LayoutOptions = serde_json::from_str(json).expect("valid options");
        assert_eq!(options.page.width, 400.0);
        assert_eq!(options.page.first_page_side, PageSide::Left);
        assert_eq!(options.page.margin.top, 75.0);
        assert_eq!(options.max_pages, Some(3));
    }
}
