use crate::chunk::Reader;
use crate::ParseError;

pub const DENSITY_DEFAULT: u16 = 0;
pub const DENSITY_MEDIUM: u16 = 160;
pub const DENSITY_ANY: u16 = 0xfffe;
pub const DENSITY_NONE: u16 = 0xffff;

const MASK_LAYOUTDIR: u8 = 0xc0;
const MASK_SCREENSIZE: u8 = 0x0f;
const MASK_SCREENLONG: u8 = 0x30;
const MASK_UI_MODE_TYPE: u8 = 0x0f;
const MASK_UI_MODE_NIGHT: u8 = 0x30;
const MASK_KEYSHIDDEN: u8 = 0x03;
const MASK_NAVHIDDEN: u8 = 0x0c;

///A device configuration: the qualifier axes a resource variant is keyed
///by (locale, density, orientation, SDK level, ...).
///
///Zeroed fields mean "unspecified/any", both on variants decoded from a
///table and on the configuration a caller requests. Callers populate the
///fields they care about and leave the rest at `Default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResTableConfig {
    pub mcc: u16,
    pub mnc: u16,
    pub language: [u8; 2],
    pub country: [u8; 2],
    pub orientation: u8,
    pub touchscreen: u8,
    pub density: u16,
    pub keyboard: u8,
    pub navigation: u8,
    pub input_flags: u8,
    pub screen_width: u16,
    pub screen_height: u16,
    pub sdk_version: u16,
    pub minor_version: u16,
    pub screen_layout: u8,
    pub ui_mode: u8,
    pub smallest_screen_width_dp: u16,
    pub screen_width_dp: u16,
    pub screen_height_dp: u16,
    pub locale_script: [u8; 4],
    pub locale_variant: [u8; 8],
    pub screen_layout2: u8,
    pub color_mode: u8,
}

impl ResTableConfig {
    ///Parses a config record. The record is self-sized: fields beyond the
    ///declared size stay at their defaults, and trailing bytes added by
    ///newer producers are skipped.
    pub(crate) fn read(r: &mut Reader) -> Result<Self, ParseError> {
        let start = r.pos();
        let size = r.read_u32()? as usize;

        let mut c = ResTableConfig::default();
        if size >= 8 {
            c.mcc = r.read_u16()?;
            c.mnc = r.read_u16()?;
        }
        if size >= 12 {
            c.language = [r.read_u8()?, r.read_u8()?];
            c.country = [r.read_u8()?, r.read_u8()?];
        }
        if size >= 16 {
            c.orientation = r.read_u8()?;
            c.touchscreen = r.read_u8()?;
            c.density = r.read_u16()?;
        }
        if size >= 20 {
            c.keyboard = r.read_u8()?;
            c.navigation = r.read_u8()?;
            c.input_flags = r.read_u8()?;
            r.skip(1)?;
        }
        if size >= 24 {
            c.screen_width = r.read_u16()?;
            c.screen_height = r.read_u16()?;
        }
        if size >= 28 {
            c.sdk_version = r.read_u16()?;
            c.minor_version = r.read_u16()?;
        }
        if size >= 32 {
            c.screen_layout = r.read_u8()?;
            c.ui_mode = r.read_u8()?;
            c.smallest_screen_width_dp = r.read_u16()?;
        }
        if size >= 36 {
            c.screen_width_dp = r.read_u16()?;
            c.screen_height_dp = r.read_u16()?;
        }
        if size >= 48 {
            let script = r.read_bytes(4)?;
            c.locale_script.copy_from_slice(script);
            let variant = r.read_bytes(8)?;
            c.locale_variant.copy_from_slice(variant);
        }
        if size >= 52 {
            c.screen_layout2 = r.read_u8()?;
            c.color_mode = r.read_u8()?;
            r.skip(2)?;
        }

        let consumed = r.pos() - start;
        if size > consumed {
            r.skip(size - consumed)?;
        }

        Ok(c)
    }

    fn layout_dir(&self) -> u8 {
        self.screen_layout & MASK_LAYOUTDIR
    }

    fn screen_size_class(&self) -> u8 {
        self.screen_layout & MASK_SCREENSIZE
    }

    fn screen_long(&self) -> u8 {
        self.screen_layout & MASK_SCREENLONG
    }

    fn ui_mode_type(&self) -> u8 {
        self.ui_mode & MASK_UI_MODE_TYPE
    }

    fn ui_mode_night(&self) -> u8 {
        self.ui_mode & MASK_UI_MODE_NIGHT
    }

    fn keys_hidden(&self) -> u8 {
        self.input_flags & MASK_KEYSHIDDEN
    }

    fn nav_hidden(&self) -> u8 {
        self.input_flags & MASK_NAVHIDDEN
    }

    ///Exclusion test: can this variant serve `requested` at all?
    ///
    ///An axis conflicts only when both sides specify it and the values
    ///disagree; a side that leaves an axis "any" never conflicts. Size-like
    ///axes additionally reject variants that demand more than requested.
    ///Density never excludes, it is purely a ranking axis.
    pub fn matches(&self, requested: &ResTableConfig) -> bool {
        fn conflict<T: PartialEq + Default>(own: T, req: T) -> bool {
            own != T::default() && req != T::default() && own != req
        }
        fn too_big(own: u16, req: u16) -> bool {
            own != 0 && req != 0 && own > req
        }

        if conflict(self.mcc, requested.mcc) || conflict(self.mnc, requested.mnc) {
            return false;
        }
        if conflict(self.language, requested.language)
            || conflict(self.country, requested.country)
            || conflict(self.locale_script, requested.locale_script)
            || conflict(self.locale_variant, requested.locale_variant)
        {
            return false;
        }
        if conflict(self.layout_dir(), requested.layout_dir()) {
            return false;
        }
        if too_big(
            u16::from(self.screen_size_class()),
            u16::from(requested.screen_size_class()),
        ) {
            return false;
        }
        if conflict(self.screen_long(), requested.screen_long()) {
            return false;
        }
        if conflict(self.orientation, requested.orientation) {
            return false;
        }
        if conflict(self.ui_mode_type(), requested.ui_mode_type())
            || conflict(self.ui_mode_night(), requested.ui_mode_night())
        {
            return false;
        }
        if conflict(self.touchscreen, requested.touchscreen) {
            return false;
        }
        if conflict(self.keys_hidden(), requested.keys_hidden())
            || conflict(self.keyboard, requested.keyboard)
        {
            return false;
        }
        if conflict(self.nav_hidden(), requested.nav_hidden())
            || conflict(self.navigation, requested.navigation)
        {
            return false;
        }
        if too_big(self.smallest_screen_width_dp, requested.smallest_screen_width_dp)
            || too_big(self.screen_width_dp, requested.screen_width_dp)
            || too_big(self.screen_height_dp, requested.screen_height_dp)
            || too_big(self.screen_width, requested.screen_width)
            || too_big(self.screen_height, requested.screen_height)
        {
            return false;
        }
        if too_big(self.sdk_version, requested.sdk_version) {
            return false;
        }
        if conflict(self.minor_version, requested.minor_version) {
            return false;
        }

        true
    }

    ///Ranking test between two variants that both passed [matches]: is
    ///`self` a more specific answer to `requested` than `other`?
    ///
    ///Axes are compared in priority order; the first axis on which the two
    ///differ decides. On categorical axes a variant that pins the axis
    ///outranks one that leaves it "any"; on size-like axes the larger value
    ///still at or below the request wins; density uses the bucket rounding
    ///rule (see [density_is_better]).
    pub fn is_better_than(&self, other: &ResTableConfig, requested: &ResTableConfig) -> bool {
        // MCC/MNC
        if requested.mcc != 0 && self.mcc != other.mcc {
            return self.mcc != 0;
        }
        if requested.mnc != 0 && self.mnc != other.mnc {
            return self.mnc != 0;
        }

        // Locale
        if requested.language != [0, 0] && self.language != other.language {
            return self.language != [0, 0];
        }
        if requested.country != [0, 0] && self.country != other.country {
            return self.country != [0, 0];
        }

        // Layout direction
        if requested.layout_dir() != 0 && self.layout_dir() != other.layout_dir() {
            return self.layout_dir() != 0;
        }

        // Smallest screen width, then screen size class and long flag
        if requested.smallest_screen_width_dp != 0
            && self.smallest_screen_width_dp != other.smallest_screen_width_dp
        {
            return self.smallest_screen_width_dp > other.smallest_screen_width_dp;
        }
        if requested.screen_size_class() != 0
            && self.screen_size_class() != other.screen_size_class()
        {
            return self.screen_size_class() > other.screen_size_class();
        }
        if requested.screen_long() != 0 && self.screen_long() != other.screen_long() {
            return self.screen_long() != 0;
        }

        // Orientation
        if requested.orientation != 0 && self.orientation != other.orientation {
            return self.orientation != 0;
        }

        // UI mode, then night mode
        if requested.ui_mode_type() != 0 && self.ui_mode_type() != other.ui_mode_type() {
            return self.ui_mode_type() != 0;
        }
        if requested.ui_mode_night() != 0 && self.ui_mode_night() != other.ui_mode_night() {
            return self.ui_mode_night() != 0;
        }

        // Density
        if self.density != other.density {
            return density_is_better(self.density, other.density, requested.density);
        }

        // Touchscreen
        if requested.touchscreen != 0 && self.touchscreen != other.touchscreen {
            return self.touchscreen != 0;
        }

        // Keyboard
        if requested.keys_hidden() != 0 && self.keys_hidden() != other.keys_hidden() {
            return self.keys_hidden() != 0;
        }
        if requested.keyboard != 0 && self.keyboard != other.keyboard {
            return self.keyboard != 0;
        }

        // Navigation
        if requested.nav_hidden() != 0 && self.nav_hidden() != other.nav_hidden() {
            return self.nav_hidden() != 0;
        }
        if requested.navigation != 0 && self.navigation != other.navigation {
            return self.navigation != 0;
        }

        // Screen dimensions, dp first
        if requested.screen_width_dp != 0 && self.screen_width_dp != other.screen_width_dp {
            return self.screen_width_dp > other.screen_width_dp;
        }
        if requested.screen_height_dp != 0 && self.screen_height_dp != other.screen_height_dp {
            return self.screen_height_dp > other.screen_height_dp;
        }
        if requested.screen_width != 0 && self.screen_width != other.screen_width {
            return self.screen_width > other.screen_width;
        }
        if requested.screen_height != 0 && self.screen_height != other.screen_height {
            return self.screen_height > other.screen_height;
        }

        // Platform version
        if requested.sdk_version != 0 && self.sdk_version != other.sdk_version {
            return self.sdk_version > other.sdk_version;
        }
        if requested.minor_version != 0 && self.minor_version != other.minor_version {
            return self.minor_version != 0;
        }

        false
    }
}

///Density bucket comparison. Unset densities count as the medium bucket.
///With the request at or above both candidates the larger wins; at or below
///both, the smaller wins; strictly between the two, the larger wins: the
///request is rounded up to the next bucket, never down to the nearer one.
fn density_is_better(own: u16, other: u16, requested: u16) -> bool {
    if own == DENSITY_ANY {
        return true;
    }
    if other == DENSITY_ANY {
        return false;
    }

    let own = if own == DENSITY_DEFAULT { DENSITY_MEDIUM } else { own };
    let other = if other == DENSITY_DEFAULT { DENSITY_MEDIUM } else { other };
    let requested = if requested == DENSITY_DEFAULT {
        DENSITY_MEDIUM
    } else {
        requested
    };

    let low = own.min(other);
    let high = own.max(other);
    let own_is_high = own > other;

    if requested >= high {
        return own_is_high;
    }
    if requested <= low {
        return !own_is_high;
    }
    own_is_high
}

///Selects the single best variant for `requested` out of `candidates`,
///returning its index. Candidates that fail [ResTableConfig::matches] are
///discarded; ties keep the earliest candidate, so the result is stable for
///a given input order.
pub fn best_match<'a, I>(candidates: I, requested: &ResTableConfig) -> Option<usize>
where
    I: IntoIterator<Item = &'a ResTableConfig>,
{
    let mut best: Option<(usize, &ResTableConfig)> = None;
    for (i, candidate) in candidates.into_iter().enumerate() {
        if !candidate.matches(requested) {
            continue;
        }
        match best {
            None => best = Some((i, candidate)),
            Some((_, current)) => {
                if candidate.is_better_than(current, requested) {
                    best = Some((i, candidate));
                }
            }
        }
    }
    best.map(|(i, _)| i)
}
